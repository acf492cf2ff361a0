//! # Solar Scraper - inverter status poller for InfluxDB
//!
//! Scrapes the live power and yield counters from a solar inverter's web UI
//! during a daily active window and stores them in InfluxDB (1.x or 2.x).
//!
//! ## Architecture
//!
//! - `config`: YAML configuration, defaults and validation
//! - `cli`: command line flags
//! - `logging`: debug and error sinks on top of `tracing`
//! - `window`: time-of-day parsing and the daily active window
//! - `reading`: the values captured per poll
//! - `status`: consecutive-error tracking and substitution of failed polls
//! - `scraper`: HTTP fetch and value extraction
//! - `influx`: InfluxDB v1/v2 writers
//! - `scheduler`: fixed-rate polling bound to the active window

pub mod cli;
pub mod config;
pub mod error;
pub mod influx;
pub mod logging;
pub mod reading;
pub mod scheduler;
pub mod scraper;
pub mod status;
pub mod window;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, ScraperError};
pub use scheduler::PollScheduler;
