use solar_scraper::error::ScraperError;

#[test]
fn error_constructors() {
    assert!(matches!(
        ScraperError::config("x"),
        ScraperError::Config { .. }
    ));
    assert!(matches!(ScraperError::io("x"), ScraperError::Io { .. }));
    assert!(matches!(
        ScraperError::network("x"),
        ScraperError::Network { .. }
    ));
    assert!(matches!(ScraperError::sink("x"), ScraperError::Sink { .. }));
    assert!(matches!(
        ScraperError::validation("f", "m"),
        ScraperError::Validation { .. }
    ));
}

#[test]
fn error_messages() {
    assert_eq!(
        ScraperError::http(404, "http://inverter/status.html").to_string(),
        "HTTP error: 404 from http://inverter/status.html"
    );
    assert_eq!(
        ScraperError::marker_not_found("var webdata_now_p = \"").to_string(),
        "string (var webdata_now_p = \") not found"
    );
    assert_eq!(
        ScraperError::validation("time.start", "bad").to_string(),
        "Validation error: time.start - bad"
    );
}

#[test]
fn io_and_yaml_errors_convert() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    assert!(matches!(ScraperError::from(io), ScraperError::Io { .. }));

    let yaml = serde_yaml::from_str::<serde_yaml::Value>("a: [").unwrap_err();
    assert!(matches!(
        ScraperError::from(yaml),
        ScraperError::Serialization { .. }
    ));
}
