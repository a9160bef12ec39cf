//! Configuration management for audiox

use crate::error::ConfigError;
use crate::logging::Verbosity;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const FFMPEG: &str = "ffmpeg";
pub const FFPROBE: &str = "ffprobe";

/// Name of the project-local config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "audiox.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// `true`/`false`, or a list of log category prefixes to report
    pub verbose: Verbosity,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Path to FFmpeg binary (auto-detected if not set)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffmpeg: Option<PathBuf>,
    /// Path to FFprobe binary (auto-detected if not set)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffprobe: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbose: Verbosity::Flag(true),
            paths: PathsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment.
    ///
    /// Later sources win: defaults, `<config dir>/audiox/config.toml`,
    /// `./audiox.toml`, `config_file`, then `AUDIOX_*` variables.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(user_config) = Self::user_config_path() {
            if user_config.exists() {
                figment = figment.merge(Toml::file(&user_config));
            }
        }

        let local_config = Path::new(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            figment = figment.merge(Toml::file(local_config));
        }

        if let Some(path) = config_file {
            if !path.exists() {
                return Err(ConfigError::LoadError(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("AUDIOX_").split("_"));

        figment.extract().map_err(|e| ConfigError::LoadError(e.to_string()))
    }

    /// Per-user config file location, if the platform has a config dir
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("audiox/config.toml"))
    }

    /// Get FFmpeg path, auto-detecting if not configured
    pub fn ffmpeg_path(&self) -> Result<PathBuf, ConfigError> {
        resolve(self.paths.ffmpeg.as_deref(), FFMPEG)
    }

    /// Get FFprobe path, auto-detecting if not configured
    pub fn ffprobe_path(&self) -> Result<PathBuf, ConfigError> {
        resolve(self.paths.ffprobe.as_deref(), FFPROBE)
    }
}

fn resolve(configured: Option<&Path>, binary: &str) -> Result<PathBuf, ConfigError> {
    if let Some(path) = configured {
        Ok(path.to_path_buf())
    } else {
        which::which(binary)
            .map_err(|_| ConfigError::InvalidValue(format!("{} not found in PATH", binary)))
    }
}
