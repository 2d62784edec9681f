use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Exchange kline window sizes the bot samples.
///
/// The five longer windows form the historical baseline; the 3-minute
/// window is treated as the current price. No other interval is valid, so
/// the enum is the whole contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    Day1,
    Hour4,
    Hour1,
    Min30,
    Min15,
    Min3,
}

impl Timeframe {
    /// The five historical windows, in sampling order.
    pub const HISTORICAL: [Timeframe; 5] = [
        Timeframe::Day1,
        Timeframe::Hour4,
        Timeframe::Hour1,
        Timeframe::Min30,
        Timeframe::Min15,
    ];

    /// Interval string in the exchange's kline query format.
    pub fn interval(&self) -> &'static str {
        match self {
            Timeframe::Day1 => "1d",
            Timeframe::Hour4 => "4h",
            Timeframe::Hour1 => "1h",
            Timeframe::Min30 => "30m",
            Timeframe::Min15 => "15m",
            Timeframe::Min3 => "3m",
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.interval())
    }
}

/// Truncate `value` down to the nearest multiple of `increment`.
///
/// Rounds toward zero, never up, so the result never exceeds `value`.
/// `increment` must be positive.
pub fn truncate_to_increment(value: Decimal, increment: Decimal) -> Decimal {
    debug_assert!(increment > Decimal::ZERO);
    ((value / increment).trunc() * increment).normalize()
}

/// One exchange-reported trading window, reduced to the fields we consume.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSample {
    pub timeframe: Timeframe,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

impl PriceSample {
    /// Typical price of the window: (high + low + close) / 3, truncated to
    /// the pair's price increment.
    pub fn average(&self, price_increment: Decimal) -> Decimal {
        let typical = (self.high + self.low + self.close) / Decimal::from(3);
        truncate_to_increment(typical, price_increment)
    }
}

/// The six reduced window averages feeding the pricing decision.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    pub day1: Decimal,
    pub hour4: Decimal,
    pub hour1: Decimal,
    pub min30: Decimal,
    pub min15: Decimal,
    pub latest: Decimal,
}

impl SampleSet {
    /// Lowest of the five historical window averages.
    pub fn historical_floor(&self) -> Decimal {
        self.day1
            .min(self.hour4)
            .min(self.hour1)
            .min(self.min30)
            .min(self.min15)
    }
}

/// Exchange-enforced precision limits for one trading pair.
///
/// All three are positive exact decimals, fetched once per run and
/// immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketConstraint {
    pub price_increment: Decimal,
    pub quantity_increment: Decimal,
    pub min_quantity: Decimal,
}

/// One portfolio line: which asset and what share of the spend it gets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationEntry {
    pub asset: String,
    pub percent: Decimal,
}

/// Direction of the latest price relative to the historical floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Rising,
    FallingOrFlat,
}

/// How the quote-currency spend is sourced across accounts.
#[derive(Debug, Clone, PartialEq)]
pub struct FundingPlan {
    pub required: Decimal,
    pub from_primary: Decimal,
    pub from_secondary: Decimal,
}

impl FundingPlan {
    pub fn covers_required(&self) -> bool {
        self.from_primary + self.from_secondary >= self.required
    }

    /// True when no redemption was needed.
    pub fn primary_only(&self) -> bool {
        self.from_secondary.is_zero()
    }
}

/// A fully priced and sized buy order, ready for submission.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntent {
    pub asset: String,
    pub price: Decimal,
    pub quantity: Decimal,
}

/// Exchange acknowledgment of a placed order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderResult {
    pub order_id: u64,
}
