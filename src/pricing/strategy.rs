use rust_decimal::Decimal;

use crate::models::{truncate_to_increment, SampleSet, Trend};

/// Uniform 0.2% markdown applied to the chosen base so the order rests
/// below market and stays maker-fee eligible.
fn maker_discount() -> Decimal {
    Decimal::new(998, 3)
}

/// Output of the pricing engine: a tick-aligned limit price and the trend
/// classification that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceDecision {
    pub price: Decimal,
    pub trend: Trend,
}

/// Choose the limit-buy price from the six window averages.
///
/// Base price is the latest sample when it sits strictly above the cheapest
/// historical window (a genuine uptrend we still want to capture), otherwise
/// the historical floor itself. Either way the base is marked down 0.2% and
/// truncated to the tick, biasing toward below-market maker orders.
pub fn decide_price(samples: &SampleSet, price_increment: Decimal) -> PriceDecision {
    let floor = samples.historical_floor();

    // strict >, so six identical samples land on the floor branch
    let (trend, base) = if samples.latest > floor {
        (Trend::Rising, samples.latest)
    } else {
        (Trend::FallingOrFlat, floor)
    };

    PriceDecision {
        price: truncate_to_increment(base * maker_discount(), price_increment),
        trend,
    }
}
