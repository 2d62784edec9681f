use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use governor::{Quota, RateLimiter};
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;

use crate::error::{BotError, Result};

const BINANCE_API_BASE: &str = "https://api.binance.com";
const RATE_LIMIT_RPM: u32 = 300;
const RECV_WINDOW_MS: u64 = 5000;

type HmacSha256 = Hmac<Sha256>;

// Type alias for the rate limiter to simplify signatures
type ApiRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// One raw kline row as the exchange reports it (12 mixed-type fields).
/// Callers shape-check before consuming.
pub type KlineRow = Vec<serde_json::Value>;

/// Thin signed REST client for the exchange.
///
/// Cloneable; all clones share the same rate limiter. Requests are never
/// retried: the redemption and order endpoints are not idempotent, and a
/// duplicate call there moves real money twice.
#[derive(Clone)]
pub struct BinanceClient {
    http: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    rate_limiter: Arc<ApiRateLimiter>,
}

/// Response from /sapi/v1/system/status
#[derive(Debug, Deserialize)]
pub struct SystemStatus {
    pub status: i64,
    pub msg: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

/// One symbol entry from /api/v3/exchangeInfo
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    pub status: String,
    #[serde(default)]
    pub order_types: Vec<String>,
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

/// Filter entries carry different fields per filterType; only the ones we
/// consume are mapped.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolFilter {
    pub filter_type: String,
    pub tick_size: Option<Decimal>,
    pub step_size: Option<Decimal>,
    pub min_qty: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    balances: Vec<AssetBalance>,
}

#[derive(Debug, Deserialize)]
struct AssetBalance {
    asset: String,
    free: Decimal,
}

#[derive(Debug, Deserialize)]
struct FlexiblePositionPage {
    #[serde(default)]
    rows: Vec<EarnPosition>,
}

/// One flexible-earn position row for an asset.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnPosition {
    pub product_id: String,
    pub total_amount: Decimal,
    pub can_redeem: bool,
}

/// Acknowledgment of a flexible-earn redemption.
#[derive(Debug, Deserialize)]
pub struct RedeemAck {
    #[serde(default)]
    pub success: bool,
}

/// Acknowledgment of an order placement. A missing id means the order was
/// not accepted onto the book.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAck {
    pub order_id: Option<u64>,
}

impl BinanceClient {
    pub fn new(api_key: String, api_secret: String) -> Result<Self> {
        Self::with_base_url(api_key, api_secret, BINANCE_API_BASE.to_string())
    }

    /// Build a client against a non-default endpoint (testnet, mock server).
    pub fn with_base_url(api_key: String, api_secret: String, base_url: String) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;

        let quota = Quota::per_minute(NonZeroU32::new(RATE_LIMIT_RPM).unwrap());
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            http,
            base_url,
            api_key,
            api_secret,
            rate_limiter,
        })
    }

    /// GET /sapi/v1/system/status
    pub async fn system_status(&self) -> Result<SystemStatus> {
        self.get_public("/sapi/v1/system/status", "").await
    }

    /// Look up one symbol in /api/v3/exchangeInfo. `None` when the exchange
    /// does not list the pair (it answers 400 for unknown symbols).
    pub async fn symbol_info(&self, symbol: &str) -> Result<Option<SymbolInfo>> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/api/v3/exchangeInfo?symbol={}", self.base_url, symbol);
        let response = self.http.get(&url).send().await?;

        if response.status() == StatusCode::BAD_REQUEST {
            return Ok(None);
        }

        let info: ExchangeInfo = Self::read_body(response).await?;
        Ok(info.symbols.into_iter().next())
    }

    /// GET /api/v3/klines. Raw rows, most recent last.
    pub async fn klines(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<KlineRow>> {
        let query = format!("symbol={symbol}&interval={interval}&limit={limit}");
        self.get_public("/api/v3/klines", &query).await
    }

    /// Spot free balance for one asset, from GET /api/v3/account.
    pub async fn free_balance(&self, asset: &str) -> Result<Decimal> {
        let account: AccountInfo = self.get_signed("/api/v3/account", "").await?;

        account
            .balances
            .into_iter()
            .find(|b| b.asset == asset)
            .map(|b| b.free)
            .ok_or_else(|| BotError::Decode(format!("account response carried no {asset} balance")))
    }

    /// GET /sapi/v1/simple-earn/flexible/position for one asset.
    pub async fn flexible_position(&self, asset: &str) -> Result<Vec<EarnPosition>> {
        let query = format!("asset={asset}");
        let page: FlexiblePositionPage = self
            .get_signed("/sapi/v1/simple-earn/flexible/position", &query)
            .await?;
        Ok(page.rows)
    }

    /// POST /sapi/v1/simple-earn/flexible/redeem. Side-effecting and not
    /// idempotent; called at most once per run.
    pub async fn redeem_flexible(&self, product_id: &str, amount: Decimal) -> Result<RedeemAck> {
        let query = format!("productId={product_id}&amount={amount}");
        self.post_signed("/sapi/v1/simple-earn/flexible/redeem", &query)
            .await
    }

    /// POST /api/v3/order. One LIMIT_MAKER buy.
    pub async fn place_limit_maker_buy(
        &self,
        symbol: &str,
        price: Decimal,
        quantity: Decimal,
        client_order_id: &str,
    ) -> Result<OrderAck> {
        let query = format!(
            "symbol={symbol}&side=BUY&type=LIMIT_MAKER&quantity={quantity}&price={price}&newClientOrderId={client_order_id}"
        );
        self.post_signed("/api/v3/order", &query).await
    }

    async fn get_public<T: DeserializeOwned>(&self, path: &str, query: &str) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let url = if query.is_empty() {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}{}?{}", self.base_url, path, query)
        };
        let response = self.http.get(&url).send().await?;
        Self::read_body(response).await
    }

    async fn get_signed<T: DeserializeOwned>(&self, path: &str, query: &str) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let payload = self.stamp(query);
        let signature = self.sign(&payload);
        let url = format!(
            "{}{}?{}&signature={}",
            self.base_url, path, payload, signature
        );
        let response = self
            .http
            .get(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;
        Self::read_body(response).await
    }

    async fn post_signed<T: DeserializeOwned>(&self, path: &str, query: &str) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let payload = self.stamp(query);
        let signature = self.sign(&payload);
        let body = format!("{payload}&signature={signature}");
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("X-MBX-APIKEY", &self.api_key)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;
        Self::read_body(response).await
    }

    /// Append the recvWindow and timestamp the exchange requires on every
    /// signed request.
    fn stamp(&self, query: &str) -> String {
        let timestamp = Utc::now().timestamp_millis();
        if query.is_empty() {
            format!("recvWindow={RECV_WINDOW_MS}&timestamp={timestamp}")
        } else {
            format!("{query}&recvWindow={RECV_WINDOW_MS}&timestamp={timestamp}")
        }
    }

    fn sign(&self, payload: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    async fn read_body<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::Exchange {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }
}
