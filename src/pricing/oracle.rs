use rust_decimal::Decimal;

use crate::api::{BinanceClient, KlineRow};
use crate::error::{BotError, Result};
use crate::models::{PriceSample, Timeframe};

/// Field count of one kline row in the exchange's market-data shape.
const KLINE_FIELD_COUNT: usize = 12;

const HIGH_IDX: usize = 2;
const LOW_IDX: usize = 3;
const CLOSE_IDX: usize = 4;

/// Sample the single most recent `timeframe` window for the pair and reduce
/// it to one tick-aligned price: (high + low + close) / 3, truncated down.
pub async fn window_average(
    client: &BinanceClient,
    asset: &str,
    quote: &str,
    timeframe: Timeframe,
    price_increment: Decimal,
) -> Result<Decimal> {
    let symbol = format!("{asset}{quote}");
    let rows = client.klines(&symbol, timeframe.interval(), 1).await?;

    let sample = parse_sample(&symbol, timeframe, &rows)?;
    Ok(sample.average(price_increment))
}

/// Shape-check the raw response: exactly one row, exactly the expected
/// field count, and parseable high/low/close decimal strings. Anything else
/// is a malformed window, not a price.
fn parse_sample(symbol: &str, timeframe: Timeframe, rows: &[KlineRow]) -> Result<PriceSample> {
    let unavailable = || BotError::SampleUnavailable {
        symbol: symbol.to_string(),
        timeframe,
    };

    if rows.len() != 1 {
        return Err(unavailable());
    }
    let row = &rows[0];
    if row.len() != KLINE_FIELD_COUNT {
        return Err(unavailable());
    }

    let field = |idx: usize| -> Result<Decimal> {
        row[idx]
            .as_str()
            .and_then(|s| s.parse().ok())
            .ok_or_else(unavailable)
    };

    Ok(PriceSample {
        timeframe,
        high: field(HIGH_IDX)?,
        low: field(LOW_IDX)?,
        close: field(CLOSE_IDX)?,
    })
}
