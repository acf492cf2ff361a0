use anyhow::Result;
use clap::Parser;
use solar_scraper::cli::Cli;
use solar_scraper::config::Config;
use solar_scraper::influx::{InfluxSink, MetricsSink};
use solar_scraper::logging::init_logging;
use solar_scraper::scheduler::PollScheduler;
use solar_scraper::scraper::InverterScraper;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_settings())
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let config = Config::load(cli.config.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    let sink = InfluxSink::from_config(&config.influxdb)?;
    if let Err(e) = sink.ping().await {
        error!("InfluxDB at {} is not reachable: {}", config.influxdb.url, e);
        return Err(anyhow::anyhow!("InfluxDB ping failed: {}", e));
    }
    info!("Connected to InfluxDB at {}", config.influxdb.url);

    let scraper = InverterScraper::new(&config.scraper)?;
    let mut scheduler = PollScheduler::new(&config, scraper, sink)?;

    info!("Solar scraper {} starting up", env!("APP_VERSION"));
    tokio::select! {
        _ = scheduler.run() => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown requested");
        }
    }
    Ok(())
}
