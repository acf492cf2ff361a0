use solar_scraper::ScraperError;
use solar_scraper::config::{Config, InfluxVersion};
use std::fs;

const MINIMAL: &str = r#"
scraper:
  url: "http://192.168.1.50/status.html"
  username: "admin"
  password: "enter123!"
influxdb:
  version: 1
  url: "http://localhost:8086"
  v1:
    database: "solar"
    username: "writer"
"#;

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yml");

    let mut cfg: Config = serde_yaml::from_str(MINIMAL).unwrap();
    cfg.time.start = "06:30".to_string();
    cfg.time.timezone = Some("Europe/Berlin".to_string());

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::load(Some(&path)).unwrap();

    assert_eq!(loaded.time.start, "06:30");
    assert_eq!(loaded.time.timezone.as_deref(), Some("Europe/Berlin"));
    assert_eq!(loaded.scraper.password, "enter123!");
    assert_eq!(loaded.influxdb.version, InfluxVersion::V1);
}

#[test]
fn load_validates() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yml");
    fs::write(&path, MINIMAL.replace("database: \"solar\"", "database: \"\"")).unwrap();

    let err = Config::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ScraperError::Validation { .. }), "{err}");
    assert!(err.to_string().contains("influxdb.v1.database"));
}

#[test]
fn load_reports_missing_file() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("absent.yml");

    let err = Config::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ScraperError::Config { .. }), "{err}");
    assert!(err.to_string().contains("absent.yml"));
}

#[test]
fn load_reports_malformed_yaml() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yml");
    fs::write(&path, "scraper: [not, a, map").unwrap();

    assert!(matches!(
        Config::load(Some(&path)),
        Err(ScraperError::Config { .. })
    ));
}

#[test]
fn from_file_does_not_validate() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yml");
    fs::write(&path, format!("time:\n  polling_interval: 0\n{}", MINIMAL)).unwrap();

    assert_eq!(Config::from_file(&path).unwrap().time.polling_interval, 0);
    let err = Config::load(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("time.polling_interval"), "{err}");
}
