pub mod order;

use rust_decimal::Decimal;

use crate::api::BinanceClient;
use crate::config::AppConfig;
use crate::error::{BotError, Result};
use crate::funding;
use crate::market::MarketMetadata;
use crate::models::{OrderIntent, OrderResult, SampleSet, Timeframe, Trend};
use crate::pricing;

pub use order::{build_intent, compute_quantity, submit};

/// Outcome of one run: which assets got an order and which failed.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub placed: Vec<(String, OrderResult)>,
    /// Intents computed but not submitted (dry run).
    pub planned: Vec<OrderIntent>,
    pub failed: Vec<(String, BotError)>,
}

enum AssetOutcome {
    Placed(OrderResult),
    Planned(OrderIntent),
}

/// Drive one full purchase run: secure funds, then price, size and submit
/// one limit-maker buy per allocated asset, in configuration order.
///
/// A funding failure aborts the run before anything else happens. Once
/// funds are confirmed each asset is an independent step: any failure is
/// logged, recorded in the summary, and the run moves on to the next entry.
pub async fn execute_run(
    client: &BinanceClient,
    config: &AppConfig,
    metadata: &MarketMetadata,
) -> Result<RunSummary> {
    tracing::info!("{:=^60}", " checking wallet balances ");
    let plan = funding::ensure_funds(client, &config.quote, config.amount, config.dry_run).await?;
    if !plan.primary_only() {
        tracing::info!(
            "💰 spend sourced as {} {} spot + {} {} redeemed",
            plan.from_primary,
            config.quote,
            plan.from_secondary,
            config.quote
        );
    }

    for entry in &config.portfolio {
        let spend = allocation_spend(config.amount, entry.percent);
        tracing::info!(
            "ℹ️ planning to buy {}% {} = {} {}",
            entry.percent,
            entry.asset,
            spend,
            config.quote
        );
    }

    tracing::info!("{:=^60}", " pricing and order placement ");

    let mut summary = RunSummary::default();
    for entry in &config.portfolio {
        if entry.percent.is_zero() {
            continue;
        }
        let spend = allocation_spend(config.amount, entry.percent);

        match execute_asset(client, config, metadata, &entry.asset, spend).await {
            Ok(AssetOutcome::Placed(result)) => summary.placed.push((entry.asset.clone(), result)),
            Ok(AssetOutcome::Planned(intent)) => summary.planned.push(intent),
            Err(err) => {
                tracing::error!("❌ {} was not purchased: {}", entry.asset, err);
                summary.failed.push((entry.asset.clone(), err));
            }
        }
        tracing::info!("{}", "-".repeat(60));
    }

    Ok(summary)
}

fn allocation_spend(amount: Decimal, percent: Decimal) -> Decimal {
    amount * percent / Decimal::from(100)
}

async fn execute_asset(
    client: &BinanceClient,
    config: &AppConfig,
    metadata: &MarketMetadata,
    asset: &str,
    spend: Decimal,
) -> Result<AssetOutcome> {
    let quote = &config.quote;
    let constraint = metadata.constraint(asset)?;
    let tick = constraint.price_increment;

    let samples = collect_samples(client, asset, quote, tick).await?;
    let decision = pricing::decide_price(&samples, tick);
    match decision.trend {
        Trend::Rising => tracing::info!("📈 {asset}/{quote} latest price is trending up"),
        Trend::FallingOrFlat => {
            tracing::info!("📉 {asset}/{quote} latest price is flat or trending down")
        }
    }
    tracing::info!("🧮 maker price set to {} {quote}", decision.price);

    let intent = order::build_intent(asset, spend, decision.price, constraint);
    tracing::info!("🚧 placing limit buy for {asset}/{quote}...");
    tracing::info!("➡️ price: {} {quote}", intent.price);
    tracing::info!("➡️ quantity: {} {asset}", intent.quantity);

    if config.dry_run {
        tracing::info!("🧪 dry run: order not submitted");
        return Ok(AssetOutcome::Planned(intent));
    }

    let result = order::submit(client, quote, &intent).await?;
    tracing::info!("✅ limit buy accepted (order id {})", result.order_id);
    Ok(AssetOutcome::Placed(result))
}

/// Sample the five historical windows plus the 3-minute "latest" window.
async fn collect_samples(
    client: &BinanceClient,
    asset: &str,
    quote: &str,
    tick: Decimal,
) -> Result<SampleSet> {
    let mut historical = [Decimal::ZERO; 5];
    for (i, timeframe) in Timeframe::HISTORICAL.iter().enumerate() {
        let average = pricing::window_average(client, asset, quote, *timeframe, tick).await?;
        tracing::info!("👁️ {asset}/{quote} {timeframe} window average: {average} {quote}");
        historical[i] = average;
    }

    let latest = pricing::window_average(client, asset, quote, Timeframe::Min3, tick).await?;
    tracing::info!("👁️ {asset}/{quote} latest ({}) average: {latest} {quote}", Timeframe::Min3);

    Ok(SampleSet {
        day1: historical[0],
        hour4: historical[1],
        hour1: historical[2],
        min30: historical[3],
        min15: historical[4],
        latest,
    })
}
