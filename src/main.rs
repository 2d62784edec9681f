use anyhow::Context;
use clap::Parser;

use dcabot::api::BinanceClient;
use dcabot::config::{AppConfig, Credentials};
use dcabot::execution;
use dcabot::market::MarketMetadata;
use dcabot::startup;

/// Recurring limit-maker portfolio accumulator for a spot exchange.
#[derive(Debug, Parser)]
#[command(name = "dcabot", version, about)]
struct Args {
    /// Path to the portfolio configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Compute and log every order without submitting anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let args = Args::parse();

    let mut config =
        AppConfig::load(&args.config).with_context(|| format!("loading {}", args.config))?;
    if args.dry_run {
        config.dry_run = true;
    }

    let credentials = Credentials::from_env()?;
    let client = BinanceClient::new(credentials.api_key.clone(), credentials.api_secret.clone())?;

    tracing::info!("{:=^60}", " startup checks ");
    startup::preflight(&client, &credentials, &config).await?;

    let metadata = MarketMetadata::load(&client, &config.portfolio, &config.quote).await?;

    let summary = execution::execute_run(&client, &config, &metadata).await?;

    if config.dry_run {
        tracing::info!("🧪 dry run complete: {} orders planned", summary.planned.len());
    } else {
        tracing::info!(
            "🏁 run complete: {} orders placed, {} assets failed",
            summary.placed.len(),
            summary.failed.len()
        );
    }
    for (asset, err) in &summary.failed {
        tracing::warn!("⚠️ {} was not purchased: {}", asset, err);
    }

    Ok(())
}

fn setup_logging() {
    tracing_subscriber::fmt().with_env_filter("dcabot=info").init();
}
