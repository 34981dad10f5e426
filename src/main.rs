use std::path::Path;

use anyhow::Result;
use chrono::{Local, NaiveDateTime, TimeZone};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use radiopulse::config::Config;
use radiopulse::estimator::ListenerEstimator;
use radiopulse::scrape::PlaylistScraper;
use radiopulse::server::Server;
use radiopulse::store::PlaylistStore;
use radiopulse::tasks::scrape_once;

#[derive(Parser)]
#[command(
    name = "radiopulse",
    version,
    about = "Radio now-playing scraper with WebSocket push and listener estimation",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (TOML); environment variables apply otherwise
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the configuration file
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server with the scrape scheduler and push ticker
    Serve,

    /// Run one scrape cycle and merge into the playlist log
    Scrape,

    /// Print a listener estimate without starting the server
    Estimate {
        /// Local time to estimate for (YYYY-MM-DD HH:MM), defaults to now
        #[arg(long)]
        at: Option<String>,

        /// Seed key for the deterministic jitter streams
        #[arg(long, default_value = "cli")]
        seed_key: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(Path::new(path))?,
        None => Config::from_env()?,
    };

    let format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&format, &config.logging.level, cli.verbose)?;

    match cli.command {
        Commands::Serve => serve(config).await?,
        Commands::Scrape => scrape(config).await?,
        Commands::Estimate { at, seed_key } => estimate(config, at, seed_key)?,
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("radiopulse=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new(format!("radiopulse={level},warn"))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    tracing::info!(
        station = %config.scrape.station,
        addr = %config.server.bind_address,
        "radiopulse starting"
    );

    let server = Server::new(config)?;
    server
        .start_with_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}

async fn scrape(config: Config) -> Result<()> {
    config.validate()?;

    let scraper = PlaylistScraper::new(&config.scrape)?;
    let store = PlaylistStore::new(
        &config.storage.playlist_path,
        config.storage.playlist_limit,
        &config.scrape.station,
    );

    let outcome = scrape_once(&scraper, &store).await?;
    println!(
        "Merged {} new item(s), {} total in {}",
        outcome.added,
        outcome.total,
        config.storage.playlist_path.display()
    );

    Ok(())
}

fn estimate(config: Config, at: Option<String>, seed_key: String) -> Result<()> {
    config.validate()?;

    let now = match at {
        Some(raw) => {
            let naive = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M")?;
            Local
                .from_local_datetime(&naive)
                .single()
                .ok_or_else(|| anyhow::anyhow!("ambiguous local time: {raw}"))?
        }
        None => Local::now(),
    };

    let estimator = ListenerEstimator::new(config.estimator.clone());
    let detail = estimator.estimate_detail(now, &seed_key, None);

    println!("Estimate for {}", now.format("%Y-%m-%d %H:%M:%S"));
    println!("  base:       {:.1}", detail.base);
    println!("  slow:       {:+.4}", detail.slow);
    println!("  fast:       {:+.4}", detail.fast);
    println!("  phase:      {:.3}", detail.phase);
    println!("  volatility: {:.3}", detail.volatility);
    println!("  clamped:    {:.1}", detail.clamped);
    println!("  listeners:  {}", detail.value);

    Ok(())
}
