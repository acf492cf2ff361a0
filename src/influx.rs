//! InfluxDB metrics sink
//!
//! Both server generations accept the same line protocol point; they differ
//! only in endpoint and authentication. The version is picked once from the
//! configuration and dispatched through the [`InfluxSink`] enum.

use crate::config::{InfluxConfig, InfluxVersion};
use crate::error::{Result, ScraperError};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::reading::Reading;
use async_trait::async_trait;
use influxdb::{Query, Timestamp, WriteQuery};
use reqwest::{RequestBuilder, Response};

pub const MEASUREMENT: &str = "PowerYield";
pub const FIELD_YIELD_TODAY: &str = "YieldToday";
pub const FIELD_YIELD_TOTAL: &str = "TotalYield";
pub const FIELD_POWER: &str = "CurrentPower";
pub const TAG_HOST: &str = "Host";

/// Durable destination for readings
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Connectivity probe
    async fn ping(&self) -> Result<()>;

    /// Persist one reading, retrying internally before giving up
    async fn write(&self, reading: &Reading) -> Result<()>;
}

/// Line protocol for one reading, second precision.
///
/// Substituted readings carry no `CurrentPower` field.
pub fn line_protocol(reading: &Reading, host: &str) -> Result<String> {
    let seconds = reading.captured_at.timestamp().max(0) as u128;
    let mut query = WriteQuery::new(Timestamp::Seconds(seconds), MEASUREMENT)
        .add_tag(TAG_HOST, host.to_string())
        .add_field(FIELD_YIELD_TODAY, reading.totals.yield_today)
        .add_field(FIELD_YIELD_TOTAL, reading.totals.yield_total);
    if let Some(power) = reading.power {
        query = query.add_field(FIELD_POWER, power);
    }
    Ok(query.build()?.get())
}

/// Settings shared by both writers
struct Transport {
    client: reqwest::Client,
    base_url: String,
    host_tag: String,
    retry: u32,
    logger: StructuredLogger,
}

impl Transport {
    fn new(config: &InfluxConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .build()
            .map_err(|e| ScraperError::config(format!("failed to build InfluxDB client: {}", e)))?;
        let logger = get_logger_with_context(
            LogContext::new("influx").with_field("version", u8::from(config.version)),
        );
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            host_tag: config.tags.host.clone(),
            retry: config.retry,
            logger,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn ping(&self) -> Result<()> {
        let url = self.endpoint("/ping");
        let response = self.client.get(&url).send().await?;
        check(response, &url).map(|_| ())
    }

    /// Send the point, retrying up to `retry` extra times
    async fn post_line<F>(&self, url: &str, line: String, prepare: F) -> Result<()>
    where
        F: Fn(RequestBuilder) -> RequestBuilder + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            let request = prepare(self.client.post(url)).body(line.clone());
            let result = match request.send().await {
                Ok(response) => check(response, url).map(|_| ()),
                Err(e) => Err(e.into()),
            };
            match result {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.retry => {
                    attempt += 1;
                    self.logger
                        .debug(&format!("Write attempt {} failed, retrying: {}", attempt, e));
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn check(response: Response, url: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ScraperError::http(status.as_u16(), url))
    }
}

/// InfluxDB 1.x writer: `/write?db=` with basic auth
pub struct InfluxV1Writer {
    transport: Transport,
    database: String,
    username: String,
    password: String,
}

impl InfluxV1Writer {
    pub fn new(config: &InfluxConfig) -> Result<Self> {
        Ok(Self {
            transport: Transport::new(config)?,
            database: config.v1.database.clone(),
            username: config.v1.username.clone(),
            password: config.v1.password.clone(),
        })
    }
}

#[async_trait]
impl MetricsSink for InfluxV1Writer {
    async fn ping(&self) -> Result<()> {
        self.transport.ping().await
    }

    async fn write(&self, reading: &Reading) -> Result<()> {
        let line = line_protocol(reading, &self.transport.host_tag)?;
        let url = self.transport.endpoint("/write");
        self.transport
            .post_line(&url, line, |request| {
                request
                    .query(&[("db", self.database.as_str()), ("precision", "s")])
                    .basic_auth(&self.username, Some(&self.password))
            })
            .await
    }
}

/// InfluxDB 2.x writer: `/api/v2/write?org=&bucket=` with a token
pub struct InfluxV2Writer {
    transport: Transport,
    org: String,
    bucket: String,
    auth_token: String,
}

impl InfluxV2Writer {
    pub fn new(config: &InfluxConfig) -> Result<Self> {
        Ok(Self {
            transport: Transport::new(config)?,
            org: config.v2.org.clone(),
            bucket: config.v2.bucket.clone(),
            auth_token: config.v2.auth_token.clone(),
        })
    }
}

#[async_trait]
impl MetricsSink for InfluxV2Writer {
    async fn ping(&self) -> Result<()> {
        self.transport.ping().await
    }

    async fn write(&self, reading: &Reading) -> Result<()> {
        let line = line_protocol(reading, &self.transport.host_tag)?;
        let url = self.transport.endpoint("/api/v2/write");
        let token = format!("Token {}", self.auth_token);
        self.transport
            .post_line(&url, line, |request| {
                request
                    .query(&[
                        ("org", self.org.as_str()),
                        ("bucket", self.bucket.as_str()),
                        ("precision", "s"),
                    ])
                    .header(reqwest::header::AUTHORIZATION, token.as_str())
            })
            .await
    }
}

/// Writer for the configured InfluxDB version
pub enum InfluxSink {
    V1(InfluxV1Writer),
    V2(InfluxV2Writer),
}

impl InfluxSink {
    pub fn from_config(config: &InfluxConfig) -> Result<Self> {
        Ok(match config.version {
            InfluxVersion::V1 => InfluxSink::V1(InfluxV1Writer::new(config)?),
            InfluxVersion::V2 => InfluxSink::V2(InfluxV2Writer::new(config)?),
        })
    }
}

#[async_trait]
impl MetricsSink for InfluxSink {
    async fn ping(&self) -> Result<()> {
        match self {
            InfluxSink::V1(w) => w.ping().await,
            InfluxSink::V2(w) => w.ping().await,
        }
    }

    async fn write(&self, reading: &Reading) -> Result<()> {
        match self {
            InfluxSink::V1(w) => w.write(reading).await,
            InfluxSink::V2(w) => w.write(reading).await,
        }
    }
}
