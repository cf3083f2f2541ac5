//! Replay configuration
//!
//! A [`ReplayConfig`] describes one CSV replay run. It can be written to and read from JSON, YAML,
//! or TOML; the format is chosen by file extension.
//!
//! ```
//! use kinematic::config::ReplayConfig;
//! use kinematic::TimeSampling;
//!
//! let cfg = ReplayConfig {
//!     input: "samples.csv".to_string(),
//!     output: "states.csv".to_string(),
//!     time_sampling: TimeSampling::Reuse,
//!     validate_samples: true,
//!     ..Default::default()
//! };
//! ```
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::TimeSampling;

fn default_log_level() -> String {
    "info".to_string()
}

/// Logger settings for the `kinematic` binary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (off, error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log file path; logs go to stderr when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}
impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            file: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// CSV file of recorded samples (`dt,accel_x,...,gyro_z`)
    pub input: String,

    /// CSV file the integrated states are written to
    pub output: String,

    /// Whether each step reads the delta time once or twice.
    #[serde(default)]
    pub time_sampling: TimeSampling,

    /// Reject non-finite samples and negative delta times instead of integrating them.
    #[serde(default)]
    pub validate_samples: bool,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serialization format of a configuration file, chosen from its extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
    Toml,
}
impl ConfigFormat {
    /// `.json`, `.yaml`/`.yml` or `.toml`, case-insensitive.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());
        match ext.as_deref() {
            Some("json") => Ok(ConfigFormat::Json),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported configuration file extension: {}", path.display()),
            )),
        }
    }
}

impl ReplayConfig {
    /// Render the configuration in `format` (JSON is pretty-printed).
    pub fn to_string_as(&self, format: ConfigFormat) -> io::Result<String> {
        match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self).map_err(io::Error::other),
            ConfigFormat::Yaml => serde_yaml::to_string(self).map_err(io::Error::other),
            ConfigFormat::Toml => toml::to_string(self).map_err(io::Error::other),
        }
    }

    /// Parse a configuration written in `format`.
    pub fn from_str_as(text: &str, format: ConfigFormat) -> io::Result<Self> {
        match format {
            ConfigFormat::Json => serde_json::from_str(text).map_err(io::Error::other),
            ConfigFormat::Yaml => serde_yaml::from_str(text).map_err(io::Error::other),
            ConfigFormat::Toml => toml::from_str(text).map_err(io::Error::other),
        }
    }

    /// Write the configuration in the format named by the file extension.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();
        let text = self.to_string_as(ConfigFormat::from_path(path)?)?;
        fs::write(path, text)
    }

    /// Read a configuration in the format named by the file extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        Self::from_str_as(&fs::read_to_string(path)?, format)
    }
}
