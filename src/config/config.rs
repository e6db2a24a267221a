//! # Relay Configuration
//!
//! The configuration is constructed once at startup, validated, and then
//! passed by reference to every component's constructor. Nothing reads it
//! from a global afterwards.
//!
//! ## Configuration Parameters
//!
//! | Parameter | Type | Default | Constraint |
//! |-----------|------|---------|------------|
//! | `webhook_url` | `String` | none | required, http(s) URL |
//! | `min_interval` | `u64` | 30 | ≥ 10 seconds |
//! | `max_interval` | `u64` | 60 | ≥ `min_interval` |
//! | `delete_after_send` | `bool` | true | |
//! | `max_file_size_mb` | `u64` | 8 | 1..=8 (platform ceiling) |
//! | `image_quality` | `u8` | 85 | 1..=100 |
//! | `log_level` | `String` | "INFO" | |
//! | `screenshot_dir` | `PathBuf` | "screenshots" | |
//! | `max_memory_mb` | `u64` | 200 | |
//! | `max_cpu_percent` | `u32` | 30 | |
//! | `enable_memory_monitoring` | `bool` | true | |
//! | `low_power_mode` | `bool` | false | |
//! | `max_resolution` | `(u32, u32)` | (1920, 1080) | both > 0 |
//! | `max_consecutive_failures` | `u32` | 5 | ≥ 1 |
//! | `min_capture_spacing_secs` | `u64` | 5 | |
//! | `resource_poll_interval_secs` | `u64` | 30 | |
//!
//! ## Examples
//!
//! ```rust
//! use screenshot_relay::config::RelayConfig;
//!
//! let mut config = RelayConfig::default();
//! config.webhook_url = Some("https://example.com/hooks/abc".to_string());
//! assert!(config.validate().is_ok());
//!
//! let budget = config.budget();
//! assert_eq!(budget.max_bytes, 8 * 1024 * 1024);
//! ```

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, RelayResult};
use crate::processing::Budget;
use crate::resource::ResourceLimits;
use shot_scale::presets::Size;

/// Upload size ceiling imposed by the webhook platform, in MB.
pub const MAX_PAYLOAD_CEILING_MB: u64 = 8;

/// Smallest allowed `min_interval`, in seconds.
pub const MIN_INTERVAL_FLOOR_SECS: u64 = 10;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Placeholder written by `--create-config`; rejected by validation.
pub const WEBHOOK_PLACEHOLDER: &str = "YOUR_WEBHOOK_URL_HERE";

/// Configuration for the capture-compress-deliver loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Upload target. The only credential is whatever the URL itself encodes.
    pub webhook_url: Option<String>,

    /// Lower bound of the random base delay between ticks, in seconds.
    pub min_interval: u64,

    /// Upper bound of the random base delay between ticks, in seconds.
    pub max_interval: u64,

    /// Remove the local artifact after a confirmed delivery.
    pub delete_after_send: bool,

    /// Hard payload ceiling in MB.
    pub max_file_size_mb: u64,

    /// JPEG quality for the first encode (1-100).
    pub image_quality: u8,

    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Directory for persisted artifacts.
    pub screenshot_dir: PathBuf,

    /// Resident memory ceiling in MB.
    pub max_memory_mb: u64,

    /// Process CPU ceiling in percent.
    pub max_cpu_percent: u32,

    /// When false the resource gate never throttles.
    pub enable_memory_monitoring: bool,

    /// Cheaper resampling, resolution cap, shorter timeouts, longer sleeps.
    pub low_power_mode: bool,

    /// Resolution cap (width, height) applied in low-power mode.
    pub max_resolution: (u32, u32),

    /// Failure streak that stops the loop.
    pub max_consecutive_failures: u32,

    /// Minimum seconds between two capture attempts.
    pub min_capture_spacing_secs: u64,

    /// Minimum seconds between two resource samples.
    pub resource_poll_interval_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            min_interval: 30,
            max_interval: 60,
            delete_after_send: true,
            max_file_size_mb: MAX_PAYLOAD_CEILING_MB,
            image_quality: 85,
            log_level: "INFO".to_string(),
            screenshot_dir: PathBuf::from("screenshots"),
            max_memory_mb: 200,
            max_cpu_percent: 30,
            enable_memory_monitoring: true,
            low_power_mode: false,
            max_resolution: (1920, 1080),
            max_consecutive_failures: 5,
            min_capture_spacing_secs: 5,
            resource_poll_interval_secs: 30,
        }
    }
}

impl RelayConfig {
    /// Sample configuration written by `--create-config`.
    pub fn sample() -> Self {
        Self {
            webhook_url: Some(WEBHOOK_PLACEHOLDER.to_string()),
            ..Self::default()
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> RelayResult<()> {
        let url = self.webhook_url.as_deref().unwrap_or("").trim();
        if url.is_empty() || url == WEBHOOK_PLACEHOLDER {
            return Err(RelayError::config(
                "webhook_url",
                url,
                "webhook URL must be provided",
            ));
        }
        match reqwest::Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(parsed) => {
                return Err(RelayError::config(
                    "webhook_url",
                    parsed.scheme(),
                    "webhook URL must use http or https",
                ));
            }
            Err(e) => {
                return Err(RelayError::config(
                    "webhook_url",
                    url,
                    format!("invalid webhook URL: {}", e),
                ));
            }
        }

        if self.min_interval < MIN_INTERVAL_FLOOR_SECS {
            return Err(RelayError::config(
                "min_interval",
                self.min_interval.to_string(),
                format!("must be at least {} seconds", MIN_INTERVAL_FLOOR_SECS),
            ));
        }
        if self.max_interval < self.min_interval {
            return Err(RelayError::config(
                "max_interval",
                self.max_interval.to_string(),
                "must not be less than min_interval",
            ));
        }
        if self.max_file_size_mb == 0 || self.max_file_size_mb > MAX_PAYLOAD_CEILING_MB {
            return Err(RelayError::config(
                "max_file_size_mb",
                self.max_file_size_mb.to_string(),
                format!("must be between 1 and {} MB", MAX_PAYLOAD_CEILING_MB),
            ));
        }
        if !(1..=100).contains(&self.image_quality) {
            return Err(RelayError::config(
                "image_quality",
                self.image_quality.to_string(),
                "must be between 1 and 100",
            ));
        }
        if self.max_resolution.0 == 0 || self.max_resolution.1 == 0 {
            return Err(RelayError::config(
                "max_resolution",
                format!("{:?}", self.max_resolution),
                "both dimensions must be greater than 0",
            ));
        }
        if self.max_consecutive_failures == 0 {
            return Err(RelayError::config(
                "max_consecutive_failures",
                "0",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Byte, quality and dimension constraints for the budgeter.
    pub fn budget(&self) -> Budget {
        Budget::new(
            self.max_file_size_mb * BYTES_PER_MB,
            self.image_quality,
            Size {
                w: self.max_resolution.0,
                h: self.max_resolution.1,
            },
        )
    }

    /// Ceilings for the resource gate.
    pub fn resource_limits(&self) -> ResourceLimits {
        ResourceLimits {
            max_memory_mb: self.max_memory_mb as f64,
            max_cpu_percent: self.max_cpu_percent as f64,
            enabled: self.enable_memory_monitoring,
            poll_interval: Duration::from_secs(self.resource_poll_interval_secs),
        }
    }

    /// Upload timeout; shorter in low-power mode.
    pub fn delivery_timeout(&self) -> Duration {
        if self.low_power_mode {
            Duration::from_secs(15)
        } else {
            Duration::from_secs(30)
        }
    }

    /// Inclusive range of the random base delay, in seconds.
    pub fn interval_range(&self) -> RangeInclusive<u64> {
        self.min_interval..=self.max_interval
    }

    /// Webhook URL shortened for log output.
    pub fn redacted_webhook(&self) -> String {
        let url = self.webhook_url.as_deref().unwrap_or("");
        let prefix: String = url.chars().take(50).collect();
        if prefix.len() < url.len() {
            format!("{}...", prefix)
        } else {
            prefix
        }
    }
}
