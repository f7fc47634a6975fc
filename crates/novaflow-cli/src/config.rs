//! Locating and reading the CLI's TOML configuration.

use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use thiserror::Error;

use novaflow::{NovaflowError, config::AppConfig};

const LOCAL_CONFIG: &str = "novaflow/config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(String),

    #[error("Missing configuration file: {}", .0.display())]
    MissingFile(PathBuf),
}

impl From<ConfigError> for NovaflowError {
    fn from(err: ConfigError) -> Self {
        NovaflowError::Config(err.to_string())
    }
}

/// Load the configuration for this run.
///
/// An explicit path must exist. Without one, the first existing file among
/// `./novaflow/config.toml` and `<platform config dir>/config.toml` is used,
/// and defaults apply when neither exists.
///
/// # Errors
///
/// Returns [`NovaflowError::Config`] for a missing explicit file or a file
/// that does not parse, and [`NovaflowError::Io`] when a file cannot be read.
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<AppConfig, NovaflowError> {
    if let Some(path) = explicit_path {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::MissingFile(path.to_path_buf()).into());
        }
        return read_config(path);
    }

    match search_paths().into_iter().find(|path| path.exists()) {
        Some(path) => read_config(&path),
        None => {
            debug!("No configuration file found, using defaults");
            Ok(AppConfig::default())
        }
    }
}

/// Implicit config locations, highest priority first.
fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
    match ProjectDirs::from("com", "novaflow", "novaflow") {
        Some(dirs) => paths.push(dirs.config_dir().join("config.toml")),
        None => debug!("Could not determine platform-specific config directory"),
    }
    paths
}

fn read_config(path: &Path) -> Result<AppConfig, NovaflowError> {
    info!(path = path.display().to_string(); "Loading configuration");
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()).into())
}
