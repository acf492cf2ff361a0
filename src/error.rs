//! Error types and handling for Solar Scraper
//!
//! Every fallible operation in the crate returns [`ScraperError`]. Inside the
//! polling loop these errors are only ever logged; the binary treats a config
//! failure or a failed startup ping as fatal.

use thiserror::Error;

/// Result type alias for Solar Scraper operations
pub type Result<T> = std::result::Result<T, ScraperError>;

/// Main error type for Solar Scraper
#[derive(Debug, Error)]
pub enum ScraperError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Transport level failures (connect, timeout, TLS)
    #[error("Network error: {message}")]
    Network { message: String },

    /// Non-success HTTP status from the inverter or InfluxDB
    #[error("HTTP error: {status} from {url}")]
    Http { status: u16, url: String },

    /// An expected script variable is missing from the status page
    #[error("string ({marker}) not found")]
    MarkerNotFound { marker: String },

    /// A value was found but is not a number
    #[error("invalid number {value:?}: {message}")]
    InvalidNumber { value: String, message: String },

    /// InfluxDB rejected or could not build a point
    #[error("InfluxDB error: {message}")]
    Sink { message: String },

    /// Time of day does not have the HH[:MM[:SS]] shape
    #[error("invalid time format, expected HH:MM:SS: {input:?}")]
    TimeFormat { input: String },

    /// Time of day component out of range
    #[error("invalid time {input:?}: {component} out of range")]
    TimeRange { input: String, component: &'static str },
}

impl ScraperError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        ScraperError::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        ScraperError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        ScraperError::Io {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        ScraperError::Network {
            message: message.into(),
        }
    }

    /// Create a new HTTP status error
    pub fn http<S: Into<String>>(status: u16, url: S) -> Self {
        ScraperError::Http {
            status,
            url: url.into(),
        }
    }

    /// Create a new missing marker error
    pub fn marker_not_found<S: Into<String>>(marker: S) -> Self {
        ScraperError::MarkerNotFound {
            marker: marker.into(),
        }
    }

    /// Create a new sink error
    pub fn sink<S: Into<String>>(message: S) -> Self {
        ScraperError::Sink {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ScraperError {
    fn from(err: std::io::Error) -> Self {
        ScraperError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for ScraperError {
    fn from(err: serde_yaml::Error) -> Self {
        ScraperError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for ScraperError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ScraperError::http(
                status.as_u16(),
                err.url().map(|u| u.to_string()).unwrap_or_default(),
            ),
            None => ScraperError::network(err.to_string()),
        }
    }
}

impl From<influxdb::Error> for ScraperError {
    fn from(err: influxdb::Error) -> Self {
        ScraperError::sink(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ScraperError::config("test config error");
        assert!(matches!(err, ScraperError::Config { .. }));

        let err = ScraperError::validation("field", "test validation error");
        assert!(matches!(err, ScraperError::Validation { .. }));

        let err = ScraperError::http(503, "http://inverter/status.html");
        assert!(matches!(err, ScraperError::Http { status: 503, .. }));
    }

    #[test]
    fn test_error_display() {
        let err = ScraperError::validation("scraper.url", "empty url");
        assert_eq!(err.to_string(), "Validation error: scraper.url - empty url");

        let err = ScraperError::marker_not_found(r#"var webdata_now_p = ""#);
        assert_eq!(err.to_string(), r#"string (var webdata_now_p = ") not found"#);
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ScraperError = io.into();
        assert!(matches!(err, ScraperError::Io { .. }));
    }
}
