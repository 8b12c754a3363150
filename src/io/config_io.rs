use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::Config;

pub const CONFIG_FILE: &str = "taskflow.toml";

/// Error type for loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("could not determine a data directory; pass --data-dir or set TASKFLOW_DATA_DIR")]
    NoDataDir,
}

/// Values given on the command line or through the environment. They take
/// priority over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
}

/// `<platform data dir>/taskflow`, e.g. `~/.local/share/taskflow`
pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
    dirs::data_dir()
        .map(|dir| dir.join("taskflow"))
        .ok_or(ConfigError::NoDataDir)
}

/// Load the config: `explicit` if given (must exist), otherwise
/// taskflow.toml in the data directory (defaults if missing). Overrides
/// are applied last.
pub fn load_config(
    data_dir: &Path,
    explicit: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<Config, ConfigError> {
    let mut config = match explicit {
        Some(path) => read_config(path)?,
        None => {
            let path = data_dir.join(CONFIG_FILE);
            if path.exists() {
                read_config(&path)?
            } else {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Config::default()
            }
        }
    };
    if let Some(level) = &overrides.log_level {
        config.log.level = level.clone();
    }
    Ok(config)
}

/// Read and parse one config file
pub fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}
