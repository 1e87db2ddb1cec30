//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::CatalystConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Why `catalyst.toml` could not be used.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read.
    Io { path: PathBuf, source: std::io::Error },
    /// The TOML did not match `CatalystConfig`.
    Parse(toml::de::Error),
    /// Parsed, but one or more values are unusable. Holds every problem found.
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "cannot read {}: {}", path.display(), source)
            }
            ConfigError::Parse(e) => write!(f, "invalid balancer config: {}", e),
            ConfigError::Validation(errors) => {
                let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
                write!(f, "invalid balancer config: {}", messages.join(", "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

/// Parse and validate balancer configuration from TOML text.
pub fn parse_config(content: &str) -> Result<CatalystConfig, ConfigError> {
    let config: CatalystConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Read `path` and hand it to [`parse_config`].
pub fn load_config(path: &Path) -> Result<CatalystConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}
