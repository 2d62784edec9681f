use anyhow::{bail, Context, Result};

use crate::api::BinanceClient;
use crate::config::{AppConfig, Credentials};

const API_KEY_LEN: usize = 64;

/// One-time environment and portfolio checks, run before anything that
/// moves money. Each check logs a confirmation line; the first failure
/// aborts the run.
pub async fn preflight(
    client: &BinanceClient,
    credentials: &Credentials,
    config: &AppConfig,
) -> Result<()> {
    check_credentials(credentials)?;
    check_exchange_reachable(client).await?;
    check_portfolio(client, config).await?;
    Ok(())
}

fn check_credentials(credentials: &Credentials) -> Result<()> {
    if credentials.api_key.len() != API_KEY_LEN || credentials.api_secret.len() != API_KEY_LEN {
        bail!("API key or secret has an unexpected length; check the .env values");
    }
    tracing::info!("✅ API credentials present and well-formed");
    Ok(())
}

async fn check_exchange_reachable(client: &BinanceClient) -> Result<()> {
    let status = client
        .system_status()
        .await
        .context("system status probe failed")?;

    if status.status != 0 || status.msg != "normal" {
        bail!(
            "exchange reports abnormal status {} ({})",
            status.status,
            status.msg
        );
    }
    tracing::info!("✅ exchange connectivity normal");
    Ok(())
}

async fn check_portfolio(client: &BinanceClient, config: &AppConfig) -> Result<()> {
    for entry in &config.portfolio {
        let symbol = format!("{}{}", entry.asset, config.quote);
        let info = client
            .symbol_info(&symbol)
            .await
            .with_context(|| format!("looking up {symbol}"))?
            .with_context(|| {
                format!("{}/{} is not a listed trading pair", entry.asset, config.quote)
            })?;
        tracing::info!("✅ {}/{} pair exists", entry.asset, config.quote);

        if info.status != "TRADING" {
            bail!(
                "{}/{} is not currently tradable (status {})",
                entry.asset,
                config.quote,
                info.status
            );
        }
        tracing::info!("✅ {}/{} pair is tradable", entry.asset, config.quote);

        if !info.order_types.iter().any(|t| t == "LIMIT_MAKER") {
            bail!(
                "{}/{} does not accept limit-maker orders",
                entry.asset,
                config.quote
            );
        }
        tracing::info!("✅ {}/{} accepts limit-maker orders", entry.asset, config.quote);
    }
    Ok(())
}
