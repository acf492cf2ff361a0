use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::get;
use solar_scraper::ScraperError;
use solar_scraper::config::ScraperConfig;
use solar_scraper::scraper::{InverterScraper, POWER_MARKER, StatusSource};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const PAGE: &str = r#"<script>
var webdata_now_p = "842";
var webdata_today_e = "5.4";
var webdata_total_e = "12034.7";
</script>"#;

#[derive(Clone)]
struct Inverter {
    hits: Arc<AtomicUsize>,
    /// Number of initial requests answered with 503
    failures: usize,
    body: &'static str,
}

async fn status_page(State(inverter): State<Inverter>, headers: HeaderMap) -> (StatusCode, String) {
    let hit = inverter.hits.fetch_add(1, Ordering::SeqCst);
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some("Basic YWRtaW46ZW50ZXIxMjMh");
    if !authorized {
        return (StatusCode::UNAUTHORIZED, String::new());
    }
    if hit < inverter.failures {
        return (StatusCode::SERVICE_UNAVAILABLE, String::new());
    }
    (StatusCode::OK, inverter.body.to_string())
}

async fn serve(inverter: Inverter) -> String {
    let app = Router::new()
        .route("/status.html", get(status_page))
        .with_state(inverter);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/status.html", addr)
}

fn config(url: String, retry: u32) -> ScraperConfig {
    ScraperConfig {
        url,
        username: "admin".to_string(),
        password: "enter123!".to_string(),
        retry,
        ..ScraperConfig::default()
    }
}

fn inverter(failures: usize, body: &'static str) -> Inverter {
    Inverter {
        hits: Arc::new(AtomicUsize::new(0)),
        failures,
        body,
    }
}

#[tokio::test]
async fn fetches_and_extracts_reading() {
    let inverter = inverter(0, PAGE);
    let url = serve(inverter.clone()).await;
    let scraper = InverterScraper::new(&config(url, 2)).unwrap();

    let reading = scraper.fetch().await.unwrap();
    assert_eq!(reading.power, Some(842));
    assert_eq!(reading.totals.yield_today, 5.4);
    assert_eq!(reading.totals.yield_total, 12034.7);
    assert_eq!(inverter.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retries_until_success() {
    let inverter = inverter(2, PAGE);
    let url = serve(inverter.clone()).await;
    let scraper = InverterScraper::new(&config(url, 2)).unwrap();

    assert!(scraper.fetch().await.is_ok());
    assert_eq!(inverter.hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn gives_up_after_retries() {
    let inverter = inverter(10, PAGE);
    let url = serve(inverter.clone()).await;
    let scraper = InverterScraper::new(&config(url, 1)).unwrap();

    let err = scraper.fetch().await.unwrap_err();
    assert!(matches!(err, ScraperError::Http { status: 503, .. }), "{err}");
    assert_eq!(inverter.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn wrong_credentials_surface_as_http_error() {
    let url = serve(inverter(0, PAGE)).await;
    let mut config = config(url, 0);
    config.password = "wrong".to_string();
    let scraper = InverterScraper::new(&config).unwrap();

    let err = scraper.fetch().await.unwrap_err();
    assert!(matches!(err, ScraperError::Http { status: 401, .. }), "{err}");
}

#[tokio::test]
async fn missing_marker_is_reported() {
    let url = serve(inverter(0, "<html>maintenance</html>")).await;
    let scraper = InverterScraper::new(&config(url, 0)).unwrap();

    let err = scraper.fetch().await.unwrap_err();
    assert_eq!(err.to_string(), format!("string ({}) not found", POWER_MARKER));
}

#[tokio::test]
async fn unreachable_host_is_a_network_error() {
    // Bind then drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let scraper = InverterScraper::new(&config(format!("http://{}/status.html", addr), 0)).unwrap();
    let err = scraper.fetch().await.unwrap_err();
    assert!(matches!(err, ScraperError::Network { .. }), "{err}");
}
