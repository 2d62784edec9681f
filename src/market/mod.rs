use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::api::binance::SymbolFilter;
use crate::api::BinanceClient;
use crate::error::{BotError, Result};
use crate::models::{AllocationEntry, MarketConstraint};

/// Immutable per-asset precision constraints, fetched once at run start and
/// passed by reference into every later stage.
#[derive(Debug)]
pub struct MarketMetadata {
    quote: String,
    constraints: HashMap<String, MarketConstraint>,
}

impl MarketMetadata {
    /// Fetch the exchange filters for every portfolio pair.
    pub async fn load(
        client: &BinanceClient,
        portfolio: &[AllocationEntry],
        quote: &str,
    ) -> Result<Self> {
        let mut constraints = HashMap::new();

        for entry in portfolio {
            let symbol = format!("{}{}", entry.asset, quote);
            let info = client
                .symbol_info(&symbol)
                .await?
                .ok_or_else(|| BotError::MetadataUnavailable {
                    symbol: symbol.clone(),
                })?;

            let constraint = constraint_from_filters(&symbol, &info.filters)?;
            tracing::info!(
                "📐 {} filters: tick {}, step {}, min qty {}",
                symbol,
                constraint.price_increment,
                constraint.quantity_increment,
                constraint.min_quantity
            );
            constraints.insert(entry.asset.clone(), constraint);
        }

        Ok(Self {
            quote: quote.to_string(),
            constraints,
        })
    }

    /// Constraint for a base asset; `MetadataUnavailable` for assets the
    /// store was never loaded with.
    pub fn constraint(&self, asset: &str) -> Result<&MarketConstraint> {
        self.constraints
            .get(asset)
            .ok_or_else(|| BotError::MetadataUnavailable {
                symbol: format!("{}{}", asset, self.quote),
            })
    }
}

fn constraint_from_filters(symbol: &str, filters: &[SymbolFilter]) -> Result<MarketConstraint> {
    let unavailable = || BotError::MetadataUnavailable {
        symbol: symbol.to_string(),
    };

    let price = filters
        .iter()
        .find(|f| f.filter_type == "PRICE_FILTER")
        .ok_or_else(unavailable)?;
    let lot = filters
        .iter()
        .find(|f| f.filter_type == "LOT_SIZE")
        .ok_or_else(unavailable)?;

    // normalize() strips trailing zeros so "0.01000000" and "0.01" compare
    // and format identically
    let price_increment = price.tick_size.ok_or_else(unavailable)?.normalize();
    let quantity_increment = lot.step_size.ok_or_else(unavailable)?.normalize();
    let min_quantity = lot.min_qty.ok_or_else(unavailable)?.normalize();

    if price_increment <= Decimal::ZERO
        || quantity_increment <= Decimal::ZERO
        || min_quantity <= Decimal::ZERO
    {
        return Err(unavailable());
    }

    Ok(MarketConstraint {
        price_increment,
        quantity_increment,
        min_quantity,
    })
}
