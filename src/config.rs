//! Configuration management for Solar Scraper
//!
//! The configuration is a YAML file with three sections: `time` (the daily
//! active window and polling rate), `scraper` (the inverter status page) and
//! `influxdb` (the metrics sink). Missing optional keys fall back to the
//! values in [`defaults`]. [`Config::load`] validates before returning, so
//! the rest of the crate can rely on a consistent configuration.

mod defaults;

use crate::error::{Result, ScraperError};
use crate::window::{ActiveWindow, TimeOfDay};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use defaults::default_host_tag;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Active window and polling interval
    #[serde(default)]
    pub time: TimeConfig,

    /// Inverter status page
    pub scraper: ScraperConfig,

    /// InfluxDB connection
    pub influxdb: InfluxConfig,
}

/// Daily polling window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// Start of the window, `HH[:MM[:SS]]`
    pub start: String,

    /// End of the window, `HH[:MM[:SS]]`
    pub end: String,

    /// Seconds between polls
    pub polling_interval: u64,

    /// IANA timezone the window is expressed in; host local time when unset
    pub timezone: Option<String>,
}

/// Inverter web interface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Status page URL
    #[serde(default)]
    pub url: String,

    /// Basic auth user
    #[serde(default)]
    pub username: String,

    /// Basic auth password
    #[serde(default)]
    pub password: String,

    /// Extra attempts per poll after the first one fails
    #[serde(default = "defaults::scraper_retry")]
    pub retry: u32,

    /// Consecutive failures that are still bridged with the last totals.
    /// Beyond this nothing is written until the inverter answers again.
    #[serde(default = "defaults::sustained_errors")]
    pub sustained_errors: u32,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::scraper_timeout")]
    pub timeout: u64,
}

/// InfluxDB protocol generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum InfluxVersion {
    #[default]
    V1,
    V2,
}

impl TryFrom<u8> for InfluxVersion {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(InfluxVersion::V1),
            2 => Ok(InfluxVersion::V2),
            other => Err(format!("invalid version {}", other)),
        }
    }
}

impl From<InfluxVersion> for u8 {
    fn from(value: InfluxVersion) -> Self {
        match value {
            InfluxVersion::V1 => 1,
            InfluxVersion::V2 => 2,
        }
    }
}

/// InfluxDB connection shared by both protocol versions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluxConfig {
    /// 1 or 2
    pub version: InfluxVersion,

    /// Server base URL
    #[serde(default)]
    pub url: String,

    /// Accept self-signed certificates
    #[serde(default)]
    pub insecure_skip_verify: bool,

    /// Extra write attempts after the first one fails
    #[serde(default = "defaults::influx_retry")]
    pub retry: u32,

    /// Request timeout in seconds
    #[serde(default = "defaults::influx_timeout")]
    pub timeout: u64,

    /// Tags attached to every point
    #[serde(default)]
    pub tags: TagsConfig,

    /// InfluxDB 1.x credentials
    #[serde(default)]
    pub v1: InfluxV1Config,

    /// InfluxDB 2.x credentials
    #[serde(default)]
    pub v2: InfluxV2Config,
}

/// Point tags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagsConfig {
    /// `Host` tag, defaults to the machine hostname
    #[serde(default = "default_host_tag")]
    pub host: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InfluxV1Config {
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InfluxV2Config {
    #[serde(default)]
    pub org: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub auth_token: String,
}

impl TimeConfig {
    /// Parse the configured window
    pub fn active_window(&self) -> Result<ActiveWindow> {
        let start: TimeOfDay = self
            .start
            .parse()
            .map_err(|e: ScraperError| ScraperError::validation("time.start", e.to_string()))?;
        let end: TimeOfDay = self
            .end
            .parse()
            .map_err(|e: ScraperError| ScraperError::validation("time.end", e.to_string()))?;
        Ok(ActiveWindow::new(start, end))
    }

    /// Configured timezone, `None` meaning host local time
    pub fn tz(&self) -> Result<Option<chrono_tz::Tz>> {
        self.timezone
            .as_deref()
            .map(|name| {
                name.parse::<chrono_tz::Tz>().map_err(|_| {
                    ScraperError::validation("time.timezone", format!("unknown timezone {}", name))
                })
            })
            .transpose()
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval)
    }

    fn validate(&self) -> Result<()> {
        if self.polling_interval == 0 {
            return Err(ScraperError::validation(
                "time.polling_interval",
                "polling interval must be greater than 0",
            ));
        }
        let window = self.active_window()?;
        let too_short = i64::try_from(self.polling_interval)
            .map_or(true, |interval| window.span_seconds() <= interval);
        if too_short {
            return Err(ScraperError::validation(
                "time",
                "time frame is smaller than the polling interval",
            ));
        }
        self.tz()?;
        Ok(())
    }
}

impl ScraperConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(ScraperError::validation("scraper.url", "empty url"));
        }
        Ok(())
    }
}

impl InfluxConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(ScraperError::validation("influxdb.url", "empty url"));
        }
        match self.version {
            InfluxVersion::V1 => {
                if self.v1.database.is_empty() {
                    return Err(ScraperError::validation(
                        "influxdb.v1.database",
                        "empty database",
                    ));
                }
                if self.v1.username.is_empty() {
                    return Err(ScraperError::validation(
                        "influxdb.v1.username",
                        "empty username",
                    ));
                }
            }
            InfluxVersion::V2 => {
                if self.v2.org.is_empty() {
                    return Err(ScraperError::validation("influxdb.v2.org", "empty org"));
                }
                if self.v2.bucket.is_empty() {
                    return Err(ScraperError::validation("influxdb.v2.bucket", "empty bucket"));
                }
            }
        }
        Ok(())
    }
}

impl Config {
    /// Default locations tried when no path is given
    pub const DEFAULT_PATHS: [&'static str; 2] = ["config.yml", "config.yaml"];

    /// Parse configuration from a YAML file without validating it
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load and validate configuration from `path`, or from the default
    /// locations in the working directory
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::DEFAULT_PATHS
                .iter()
                .map(PathBuf::from)
                .find(|p| p.exists())
                .ok_or_else(|| {
                    ScraperError::config(format!(
                        "no configuration file found, tried {}",
                        Self::DEFAULT_PATHS.join(", ")
                    ))
                })?,
        };

        let config = Self::from_file(&path).map_err(|e| {
            ScraperError::config(format!("error reading config file {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.time.validate()?;
        self.scraper.validate()?;
        self.influxdb.validate()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
