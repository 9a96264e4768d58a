//! Job-file diagnostics rendered with source spans

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// YAML syntax error with source location
#[derive(Debug, Error, Diagnostic)]
#[error("invalid YAML: {message}")]
#[diagnostic(code(pbfe::yaml::syntax))]
pub struct YamlSyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("error here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    /// The underlying error message
    message: String,
}

impl YamlSyntaxError {
    /// Create a syntax error from a serde_yml error
    pub fn from_serde_error(err: &serde_yml::Error, source: &str, filename: &str) -> Self {
        let (line, column) = err
            .location()
            .map(|loc| (loc.line(), loc.column()))
            .unwrap_or((1, 1));

        let offset = line_col_to_offset(source, line, column);
        let message = err.to_string();
        let help = generate_help(&message);

        Self {
            src: NamedSource::new(filename, source.to_string()),
            span: SourceSpan::from(offset..offset.saturating_add(1)),
            help,
            message,
        }
    }
}

/// Generic YAML error wrapper
#[derive(Debug, Error, Diagnostic)]
pub enum YamlError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] YamlSyntaxError),

    #[error("cannot read YAML file: {0}")]
    #[diagnostic(code(pbfe::yaml::io))]
    Io(#[from] std::io::Error),
}

/// Convert line/column to byte offset
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let mut offset = 0;
    let mut current_line = 1;

    for (i, ch) in source.char_indices() {
        if current_line == line {
            // Find the column within this line
            let line_start = i;
            let mut col = 1;
            for (j, c) in source[line_start..].char_indices() {
                if col == column {
                    return line_start + j;
                }
                if c == '\n' {
                    break;
                }
                col += 1;
            }
            return line_start + column.saturating_sub(1);
        }
        if ch == '\n' {
            current_line += 1;
        }
        offset = i;
    }

    offset
}

/// Suggest a fix for common job-file mistakes
fn generate_help(message: &str) -> Option<String> {
    let msg = message.to_lowercase();

    if msg.contains("tab") {
        return Some("Indent with spaces, not tabs.".to_string());
    }

    if msg.contains("unknown variant") && msg.contains("use_global_default") {
        return Some(
            "`parameters` must be `use_global_default` or a `custom:` block with every parameter"
                .to_string(),
        );
    }

    if msg.contains("unknown variant") {
        return Some(
            "Cost categories are: labor, consumables, energy, equipment, facility, digital, maintenance"
                .to_string(),
        );
    }

    if msg.contains("missing field") {
        if let Some(field) = message.split('`').nth(1) {
            return Some(format!(
                "Add `{}`. Run `pbfe params` to print a complete parameter set.",
                field
            ));
        }
        return Some("A required field is missing.".to_string());
    }

    if msg.contains("invalid record prefix") || msg.contains("invalid ulid") {
        return Some("Job IDs look like JOB-01HQ3K4N5M6P7R8S9T0VWXYZAB".to_string());
    }

    if msg.contains("duplicate") {
        return Some("Each key can only appear once. Remove or rename the duplicate key.".to_string());
    }

    if msg.contains("invalid type") {
        return Some("Numeric fields take plain numbers without units or thousands separators.".to_string());
    }

    if msg.contains("mapping values are not allowed") {
        return Some("You may be missing a space after ':' or have incorrect indentation.".to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_to_offset() {
        let source = "line1\nline2\nline3";
        assert_eq!(line_col_to_offset(source, 1, 1), 0);
        assert_eq!(line_col_to_offset(source, 2, 1), 6);
        assert_eq!(line_col_to_offset(source, 3, 1), 12);
    }

    #[test]
    fn test_help_generation() {
        assert!(generate_help("found tab character").is_some());
        assert!(generate_help("duplicate entry with key").is_some());
        assert!(generate_help("some random error").is_none());
    }

    #[test]
    fn test_missing_field_help_names_field() {
        let help = generate_help("part: missing field `layer_thickness_mm` at line 4").unwrap();
        assert!(help.contains("layer_thickness_mm"));
    }

    #[test]
    fn test_syntax_error_from_job_source() {
        let source = "id: JOB-01HQ3K4N5M6P7R8S9T0VWXYZAB\npart:\n\tname: x\n";
        let err = serde_yml::from_str::<serde_yml::Value>(source).unwrap_err();
        let diag = YamlSyntaxError::from_serde_error(&err, source, "bad.job.yaml");
        assert!(diag.to_string().starts_with("invalid YAML"));
    }
}
