use anyhow::{bail, Context};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::AllocationEntry;

/// Runtime configuration: what to buy, with how much, against which quote.
///
/// Loaded from a TOML file. Credentials come from the environment so they
/// never sit next to the portfolio definition.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub quote: String,
    pub amount: Decimal,
    #[serde(default)]
    pub dry_run: bool,
    pub portfolio: Vec<AllocationEntry>,
}

/// Exchange API credentials, read from the environment (.env supported).
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl AppConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()
            .with_context(|| format!("reading configuration from {path}"))?
            .try_deserialize()
            .context("configuration file has an unexpected shape")?;

        config.validate()?;
        Ok(config)
    }

    /// Allocations must sum to exactly 100 and each asset may appear only
    /// once. Zero-percent entries are legal; they are skipped at run time.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.quote.is_empty() {
            bail!("quote asset must not be empty");
        }
        if self.amount <= Decimal::ZERO {
            bail!("spend amount must be positive, got {}", self.amount);
        }

        let mut seen = std::collections::HashSet::new();
        let mut total = Decimal::ZERO;
        for entry in &self.portfolio {
            if entry.percent < Decimal::ZERO || entry.percent > Decimal::from(100) {
                bail!(
                    "{} allocation {}% is outside the 0-100 range",
                    entry.asset,
                    entry.percent
                );
            }
            if !seen.insert(entry.asset.as_str()) {
                bail!("{} appears more than once in the portfolio", entry.asset);
            }
            total += entry.percent;
        }

        if total != Decimal::from(100) {
            bail!("portfolio allocations must sum to exactly 100%, got {total}%");
        }
        Ok(())
    }
}

impl Credentials {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("BINANCE_API_KEY")
            .context("BINANCE_API_KEY not set; check the .env file")?;
        let api_secret = std::env::var("BINANCE_SECRET_KEY")
            .context("BINANCE_SECRET_KEY not set; check the .env file")?;
        Ok(Self {
            api_key,
            api_secret,
        })
    }
}
