//! Inverter status page scraper
//!
//! The inverter's web UI embeds its live values as JavaScript variables:
//!
//! ```text
//! var webdata_now_p = "150";
//! var webdata_today_e = "3.10";
//! var webdata_total_e = "4756.2";
//! ```
//!
//! [`InverterScraper`] fetches the page with basic auth and pulls out the
//! quoted value after each marker.

use crate::config::ScraperConfig;
use crate::error::{Result, ScraperError};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::reading::{Reading, Totals};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, HeaderValue};

/// Marker preceding the instantaneous power in W
pub const POWER_MARKER: &str = r#"var webdata_now_p = ""#;
/// Marker preceding today's yield in kWh
pub const YIELD_TODAY_MARKER: &str = r#"var webdata_today_e = ""#;
/// Marker preceding the lifetime yield in kWh
pub const YIELD_TOTAL_MARKER: &str = r#"var webdata_total_e = ""#;

/// Anything that can produce a fresh reading
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch(&self) -> Result<Reading>;
}

/// Pre-encoded basic auth credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials(String);

impl Credentials {
    /// Base64 of `username:password`
    pub fn encode(username: &str, password: &str) -> Self {
        Self(STANDARD.encode(format!("{}:{}", username, password)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn header_value(&self) -> Result<HeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Basic {}", self.0))
            .map_err(|e| ScraperError::config(format!("invalid credentials: {}", e)))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credentials(***)")
    }
}

/// Text between `marker` and the next double quote, parsed as a number
fn value_after(body: &str, marker: &str) -> Result<f64> {
    let (_, rest) = body
        .split_once(marker)
        .ok_or_else(|| ScraperError::marker_not_found(marker))?;
    let raw = rest.split_once('"').map_or("", |(value, _)| value);
    raw.trim()
        .parse::<f64>()
        .map_err(|e| ScraperError::InvalidNumber {
            value: raw.to_string(),
            message: e.to_string(),
        })
}

/// Extract the three values from a status page body
pub fn extract_reading(body: &str, captured_at: DateTime<Utc>) -> Result<Reading> {
    let power = value_after(body, POWER_MARKER)?;
    let yield_today = value_after(body, YIELD_TODAY_MARKER)?;
    let yield_total = value_after(body, YIELD_TOTAL_MARKER)?;

    // Float to int casts saturate, so negative or NaN readings land on 0
    let power = power.round() as u64;
    Ok(Reading::measured(
        power,
        Totals {
            yield_today,
            yield_total,
        },
        captured_at,
    ))
}

/// HTTP client for the inverter status page
pub struct InverterScraper {
    client: reqwest::Client,
    url: String,
    auth: HeaderValue,
    retry: u32,
    logger: StructuredLogger,
}

impl InverterScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ScraperError::config(format!("failed to build HTTP client: {}", e)))?;
        let auth = Credentials::encode(&config.username, &config.password).header_value()?;
        let logger = get_logger_with_context(LogContext::new("scraper").with_field("url", &config.url));

        Ok(Self {
            client,
            url: config.url.clone(),
            auth,
            retry: config.retry,
            logger,
        })
    }

    async fn attempt(&self) -> Result<Reading> {
        let response = self
            .client
            .get(&self.url)
            .header(AUTHORIZATION, self.auth.clone())
            .send()
            .await?;
        // Taken before the body is read so the timestamp tracks the inverter
        let captured_at = Utc::now();

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::http(status.as_u16(), self.url.as_str()));
        }
        let body = response.text().await?;
        extract_reading(&body, captured_at)
    }
}

#[async_trait]
impl StatusSource for InverterScraper {
    /// One attempt plus up to `retry` more; the last error wins
    async fn fetch(&self) -> Result<Reading> {
        let mut attempt = 0;
        loop {
            match self.attempt().await {
                Ok(reading) => return Ok(reading),
                Err(e) if attempt < self.retry => {
                    attempt += 1;
                    self.logger
                        .debug(&format!("Attempt {} failed, retrying: {}", attempt, e));
                }
                Err(e) => return Err(e),
            }
        }
    }
}
