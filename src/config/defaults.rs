use super::*;

pub(super) fn scraper_retry() -> u32 {
    2
}

pub(super) fn sustained_errors() -> u32 {
    5
}

pub(super) fn scraper_timeout() -> u64 {
    10
}

pub(super) fn influx_retry() -> u32 {
    2
}

pub(super) fn influx_timeout() -> u64 {
    5
}

/// Machine hostname, empty when it cannot be represented as UTF-8
pub fn default_host_tag() -> String {
    gethostname::gethostname()
        .into_string()
        .unwrap_or_default()
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            start: "00:00:00".to_string(),
            end: "23:59:59".to_string(),
            polling_interval: 60,
            timezone: None,
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: String::new(),
            password: String::new(),
            retry: scraper_retry(),
            sustained_errors: sustained_errors(),
            timeout: scraper_timeout(),
        }
    }
}

impl Default for TagsConfig {
    fn default() -> Self {
        Self {
            host: default_host_tag(),
        }
    }
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            version: InfluxVersion::V1,
            url: String::new(),
            insecure_skip_verify: false,
            retry: influx_retry(),
            timeout: influx_timeout(),
            tags: TagsConfig::default(),
            v1: InfluxV1Config::default(),
            v2: InfluxV2Config::default(),
        }
    }
}
