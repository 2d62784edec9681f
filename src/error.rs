use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::Timeframe;

/// Error kinds surfaced by the bot.
///
/// Failures at or before funding abort the run; once funds are confirmed,
/// a failure is contained to the asset being processed.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("{symbol} is not a tradable pair or its exchange filters are missing")]
    MetadataUnavailable { symbol: String },

    #[error("no usable {timeframe} window for {symbol}")]
    SampleUnavailable {
        symbol: String,
        timeframe: Timeframe,
    },

    #[error("available balance {available} does not cover the required {required}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("flexible earn position for {asset} is missing or not redeemable")]
    RedemptionAccountUnavailable { asset: String },

    #[error("redemption of {amount} {asset} was not acknowledged by the exchange")]
    RedemptionFailed { asset: String, amount: Decimal },

    #[error("limit order for {symbol} was acknowledged without an order id")]
    OrderRejected { symbol: String },

    #[error("exchange request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("exchange returned HTTP {status}: {body}")]
    Exchange { status: u16, body: String },

    #[error("malformed exchange response: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, BotError>;
