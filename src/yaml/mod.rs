//! YAML parsing with source-annotated diagnostics

pub mod diagnostics;

pub use diagnostics::{YamlError, YamlSyntaxError};

use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Deserialize a YAML document, mapping failures to a spanned diagnostic
pub fn parse_yaml<T: DeserializeOwned + 'static>(source: &str, filename: &str) -> Result<T, YamlSyntaxError> {
    serde_yml::from_str(source).map_err(|e| YamlSyntaxError::from_serde_error(&e, source, filename))
}

/// Read and deserialize a YAML file
pub fn parse_yaml_file<T: DeserializeOwned + 'static>(path: &Path) -> Result<T, YamlError> {
    let source = fs::read_to_string(path)?;
    let filename = path.display().to_string();
    Ok(parse_yaml(&source, &filename)?)
}
