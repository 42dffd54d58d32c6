//! Optional `season-record.toml` configuration
//!
//! Every key is optional. Command-line flags take precedence over the file,
//! and the file over built-in defaults.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "season-record.toml";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tracing filter directive, e.g. `debug` or `season_record=trace`
    pub log_level: Option<String>,
    pub compile: CompileConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    pub recurse: Option<bool>,
    pub jobs: Option<usize>,
    pub shows_file: Option<PathBuf>,
    pub episodes_file: Option<PathBuf>,
    /// Written only when set here or on the command line
    pub last_episodes_file: Option<PathBuf>,
    pub summary_file: Option<PathBuf>,
}

impl Config {
    /// Loads `path` when given. Otherwise reads `season-record.toml` from the
    /// working directory if it exists, and falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Tracing filter directive. `-v` flags win over the `RUST_LOG` value
    /// in `env`, which wins over the file's `log_level`.
    pub fn log_directive(&self, verbose: u8, env: Option<String>) -> String {
        match verbose {
            0 => env
                .filter(|directive| !directive.trim().is_empty())
                .unwrap_or_else(|| self.log_level().to_string()),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    }
}

/// Worker count when neither flag nor config sets one
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn parses_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(
            &path,
            "log_level = \"debug\"\n\n[compile]\njobs = 3\nshows_file = \"out/shows.csv\"\nlast_episodes_file = \"last.csv\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.compile.jobs, Some(3));
        assert_eq!(config.compile.shows_file, Some(PathBuf::from("out/shows.csv")));
        assert_eq!(config.compile.last_episodes_file, Some(PathBuf::from("last.csv")));
        assert_eq!(config.compile.recurse, None);
        assert_eq!(config.compile.summary_file, None);
    }

    #[test]
    fn empty_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.toml");
        fs::write(&path, "").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.log_level(), DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[compile]\njobs = \"many\"\n").unwrap();
        assert!(matches!(Config::from_file(&path), Err(ConfigError::Parse { .. })));
        assert!(matches!(
            Config::from_file(&dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn verbose_flag_beats_environment() {
        let config = Config {
            log_level: Some("warn".to_string()),
            ..Config::default()
        };
        let env = || Some("season_record=error".to_string());
        assert_eq!(config.log_directive(1, env()), "debug");
        assert_eq!(config.log_directive(3, env()), "trace");
        assert_eq!(config.log_directive(0, env()), "season_record=error");
        assert_eq!(config.log_directive(0, Some(" ".to_string())), "warn");
        assert_eq!(config.log_directive(0, None), "warn");
        assert_eq!(Config::default().log_directive(0, None), DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn at_least_one_job() {
        assert!(default_jobs() >= 1);
    }
}
