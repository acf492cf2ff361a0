//! Command line flags

use crate::logging::LogSettings;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Poll a solar inverter's status page and store the readings in InfluxDB
#[derive(Debug, Clone, Parser)]
#[command(name = "solar-scraper", version = env!("APP_VERSION"), disable_version_flag = true)]
pub struct Cli {
    /// Configuration file (defaults to ./config.yml or ./config.yaml)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long)]
    pub debug: bool,

    /// Write log output to this file instead of the console
    #[arg(short, long, value_name = "PATH")]
    pub log: Option<PathBuf>,

    /// Print version
    #[arg(short = 'v', long, action = ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,
}

impl Cli {
    pub fn log_settings(&self) -> LogSettings {
        LogSettings {
            file: self.log.clone(),
            debug: self.debug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["solar-scraper"]).unwrap();
        assert!(cli.config.is_none());
        assert!(!cli.debug);
        assert!(cli.log.is_none());
    }

    #[test]
    fn short_and_long_flags() {
        let cli = Cli::try_parse_from(["solar-scraper", "-c", "/etc/solar.yml", "-d", "-l", "out.log"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/solar.yml")));
        assert!(cli.debug);

        let settings = cli.log_settings();
        assert!(settings.debug);
        assert_eq!(settings.file, Some(PathBuf::from("out.log")));

        let cli = Cli::try_parse_from(["solar-scraper", "--config", "a.yml", "--log", "b.log"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("a.yml")));
        assert_eq!(cli.log, Some(PathBuf::from("b.log")));
    }

    #[test]
    fn version_flag() {
        let err = Cli::try_parse_from(["solar-scraper", "-v"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
        let err = Cli::try_parse_from(["solar-scraper", "--version"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let err = Cli::try_parse_from(["solar-scraper", "--verbose"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }
}
