use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("config file not found: {}", .0.display())]
  NotFound(PathBuf),

  #[error("no configuration file found; create one at ~/.config/tablab/config.yaml")]
  Missing,

  #[error("failed to read config file {}: {source}", .path.display())]
  Io { path: PathBuf, source: std::io::Error },

  #[error("failed to parse config file {}: {source}", .path.display())]
  Parse { path: PathBuf, source: serde_yaml::Error },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub server: ServerConfig,
  /// Drop a failed mutation's own pending marker instead of leaving it for
  /// the next info refetch to retire.
  #[serde(default)]
  pub clear_pending_on_failure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub url: String,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./tablab.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/tablab/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(ConfigError::NotFound(p.to_path_buf()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(ConfigError::Missing),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("tablab.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("tablab").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
    let contents = std::fs::read_to_string(path)
      .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;

    serde_yaml::from_str(&contents)
      .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
  }

  /// API token from the environment; absent means unauthenticated requests.
  pub fn api_token() -> Option<String> {
    std::env::var("TABLAB_API_TOKEN").ok()
  }
}
