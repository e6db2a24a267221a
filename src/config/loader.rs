//! Layered configuration loading: defaults, then the JSON file, then
//! environment variables, then validation.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::warn;

use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};

/// Why the configuration file was not used and the defaults were taken.
///
/// Loading usually happens before logging is installed, so the fallback is
/// handed back to the caller instead of being logged on the spot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileFallback {
    Missing { path: PathBuf },
    Unreadable { path: PathBuf, reason: String },
}

impl FileFallback {
    pub fn path(&self) -> &Path {
        match self {
            Self::Missing { path } | Self::Unreadable { path, .. } => path,
        }
    }

    /// Emit the fallback as a warning on the installed subscriber.
    pub fn log(&self) {
        match self {
            Self::Missing { path } => {
                warn!(path = %path.display(), "Config file not found, using defaults")
            }
            Self::Unreadable { path, reason } => {
                warn!(
                    path = %path.display(),
                    error = %reason,
                    "Failed to load config file, using defaults"
                )
            }
        }
    }
}

impl fmt::Display for FileFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { path } => {
                write!(f, "config file {} not found, using defaults", path.display())
            }
            Self::Unreadable { path, reason } => write!(
                f,
                "failed to load config file {} ({}), using defaults",
                path.display(),
                reason
            ),
        }
    }
}

/// A loaded configuration plus the file fallback, if one was taken.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: RelayConfig,
    pub fallback: Option<FileFallback>,
}

impl RelayConfig {
    /// Load from `path` and the process environment, then validate.
    pub fn load(path: &Path) -> RelayResult<LoadedConfig> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Same as [`RelayConfig::load`] with an injectable environment lookup.
    pub fn load_with_env<F>(path: &Path, lookup: F) -> RelayResult<LoadedConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (mut config, fallback) = match Self::from_file(path) {
            Ok(config) => (config, None),
            Err(fallback) => (Self::default(), Some(fallback)),
        };
        config.apply_env_overrides(lookup)?;
        config.validate()?;
        Ok(LoadedConfig { config, fallback })
    }

    /// Read the JSON file. A missing or unreadable file is reported as the
    /// [`FileFallback`] the caller should warn about.
    pub fn from_file(path: &Path) -> Result<Self, FileFallback> {
        if !path.exists() {
            return Err(FileFallback::Missing {
                path: path.to_path_buf(),
            });
        }
        std::fs::read_to_string(path)
            .map_err(|e| RelayError::io_at("read config", path, e))
            .and_then(|text| Self::from_json(&text))
            .map_err(|e| FileFallback::Unreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    /// Parse a JSON document. Absent keys keep their defaults.
    pub fn from_json(text: &str) -> RelayResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Apply environment overrides looked up through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> RelayResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("WEBHOOK_URL") {
            self.webhook_url = Some(url);
        }
        if let Some(v) = parse_env(&lookup, "MIN_INTERVAL")? {
            self.min_interval = v;
        }
        if let Some(v) = parse_env(&lookup, "MAX_INTERVAL")? {
            self.max_interval = v;
        }
        if let Some(v) = lookup("DELETE_AFTER_SEND") {
            self.delete_after_send = parse_flag(&v);
        }
        if let Some(v) = parse_env(&lookup, "MAX_FILE_SIZE_MB")? {
            self.max_file_size_mb = v;
        }
        if let Some(v) = parse_env(&lookup, "IMAGE_QUALITY")? {
            self.image_quality = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = lookup("SCREENSHOT_DIR") {
            self.screenshot_dir = v.into();
        }
        if let Some(v) = parse_env(&lookup, "MAX_MEMORY_MB")? {
            self.max_memory_mb = v;
        }
        if let Some(v) = parse_env(&lookup, "MAX_CPU_PERCENT")? {
            self.max_cpu_percent = v;
        }
        if let Some(v) = lookup("ENABLE_MEMORY_MONITORING") {
            self.enable_memory_monitoring = parse_flag(&v);
        }
        if let Some(v) = lookup("LOW_POWER_MODE") {
            self.low_power_mode = parse_flag(&v);
        }
        Ok(())
    }

    /// Write the sample configuration as pretty JSON.
    pub fn write_sample(path: &Path) -> RelayResult<()> {
        let text = serde_json::to_string_pretty(&Self::sample())?;
        std::fs::write(path, text).map_err(|e| RelayError::io_at("write sample config", path, e))
    }
}

fn parse_env<T, F>(lookup: &F, key: &str) -> RelayResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| RelayError::config(key, raw.as_str(), e.to_string())),
    }
}

fn parse_flag(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("true")
}
