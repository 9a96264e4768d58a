//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::entities::EffectiveParameters;
use crate::yaml::{parse_yaml_file, YamlError};

/// Directory holding project-local configuration
pub const PROJECT_CONFIG_DIR: &str = ".pbfe";

/// pbfe configuration with layered hierarchy
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// YAML file holding the global default parameters
    pub defaults_file: Option<PathBuf>,

    /// Default Monte Carlo iteration count, overriding the parameters record
    pub iterations: Option<u32>,

    /// Simulation worker threads
    pub workers: Option<usize>,

    /// SQLite file for cached simulation results
    pub cache_file: Option<PathBuf>,

    /// Default output format
    pub default_format: Option<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let mut config = Config::default();

        // 1. Global user config (~/.config/pbfe/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            config.merge_file(&global_path);
        }

        // 2. Project config (.pbfe/config.yaml in the working directory or an ancestor)
        if let Some(project_path) = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::project_config_path(&cwd))
        {
            config.merge_file(&project_path);
        }

        // 3. Environment variables
        config.apply_env(|key| std::env::var(key).ok());

        config
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "pbfe")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Nearest `.pbfe/config.yaml` at or above `start`
    pub fn project_config_path(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(PROJECT_CONFIG_DIR).join("config.yaml"))
            .find(|path| path.is_file())
    }

    /// Default location of the simulation cache database
    pub fn default_cache_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "pbfe")
            .map(|dirs| dirs.cache_dir().join("simulations.db"))
    }

    fn merge_file(&mut self, path: &Path) {
        if !path.exists() {
            return;
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yml::from_str::<Config>(&contents) {
                Ok(layer) => {
                    debug!(path = %path.display(), "loaded config layer");
                    self.merge(layer);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "ignoring malformed config"),
            },
            Err(e) => warn!(path = %path.display(), error = %e, "cannot read config"),
        }
    }

    /// Apply `PBFE_*` overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("PBFE_DEFAULTS") {
            self.defaults_file = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup("PBFE_ITERATIONS") {
            match raw.parse() {
                Ok(n) => self.iterations = Some(n),
                Err(_) => warn!(value = %raw, "ignoring non-numeric PBFE_ITERATIONS"),
            }
        }
        if let Some(raw) = lookup("PBFE_WORKERS") {
            match raw.parse() {
                Ok(n) => self.workers = Some(n),
                Err(_) => warn!(value = %raw, "ignoring non-numeric PBFE_WORKERS"),
            }
        }
        if let Some(path) = lookup("PBFE_CACHE") {
            self.cache_file = Some(PathBuf::from(path));
        }
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Config) {
        if other.defaults_file.is_some() {
            self.defaults_file = other.defaults_file;
        }
        if other.iterations.is_some() {
            self.iterations = other.iterations;
        }
        if other.workers.is_some() {
            self.workers = other.workers;
        }
        if other.cache_file.is_some() {
            self.cache_file = other.cache_file;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
    }

    /// The global default parameters record.
    ///
    /// Read from `defaults_file` when set, otherwise the built-in defaults.
    pub fn global_parameters(&self) -> Result<EffectiveParameters, YamlError> {
        match &self.defaults_file {
            Some(path) => parse_yaml_file(path),
            None => Ok(EffectiveParameters::default()),
        }
    }

    /// Cache database path, falling back to the user cache directory
    pub fn cache_path(&self) -> Option<PathBuf> {
        self.cache_file.clone().or_else(Self::default_cache_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_merge_prefers_later_layer() {
        let mut base = Config {
            iterations: Some(500),
            default_format: Some("yaml".to_string()),
            ..Config::default()
        };
        base.merge(Config {
            iterations: Some(2000),
            ..Config::default()
        });
        assert_eq!(base.iterations, Some(2000));
        assert_eq!(base.default_format.as_deref(), Some("yaml"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PBFE_ITERATIONS", "250"),
            ("PBFE_WORKERS", "lots"),
            ("PBFE_CACHE", "/tmp/sim.db"),
        ]
        .into_iter()
        .collect();

        let mut config = Config {
            workers: Some(3),
            ..Config::default()
        };
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.iterations, Some(250));
        assert_eq!(config.workers, Some(3));
        assert_eq!(config.cache_file, Some(PathBuf::from("/tmp/sim.db")));
    }

    #[test]
    fn test_project_config_found_from_subdirectory() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join(PROJECT_CONFIG_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.yaml"), "iterations: 42\n").unwrap();
        let nested = tmp.path().join("jobs").join("brackets");
        std::fs::create_dir_all(&nested).unwrap();

        let path = Config::project_config_path(&nested).unwrap();
        let mut config = Config::default();
        config.merge_file(&path);
        assert_eq!(config.iterations, Some(42));
    }

    #[test]
    fn test_global_parameters_from_defaults_file() {
        let tmp = tempdir().unwrap();
        let mut params = EffectiveParameters::default();
        params.price_per_part = 1800.0;
        let path = tmp.path().join("defaults.yaml");
        std::fs::write(&path, serde_yml::to_string(&params).unwrap()).unwrap();

        let config = Config {
            defaults_file: Some(path),
            ..Config::default()
        };
        assert_eq!(config.global_parameters().unwrap().price_per_part, 1800.0);
        assert_eq!(
            Config::default().global_parameters().unwrap(),
            EffectiveParameters::default()
        );
    }
}
