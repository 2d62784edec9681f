use rust_decimal::Decimal;

use crate::api::BinanceClient;
use crate::error::{BotError, Result};
use crate::models::FundingPlan;

/// Secure `required` units of the quote asset before any order is placed.
///
/// Waterfall: the spot (immediately tradable) balance first; any shortfall
/// comes out of the flexible earn position. The redemption call is
/// side-effecting and never retried. In dry-run the sufficiency math still
/// runs but the redemption itself is suppressed.
pub async fn ensure_funds(
    client: &BinanceClient,
    quote: &str,
    required: Decimal,
    dry_run: bool,
) -> Result<FundingPlan> {
    let free = client.free_balance(quote).await?;
    tracing::info!("🔎 spot account holds {free} {quote} available for trading");

    if free >= required {
        tracing::info!("✅ spot balance covers the full {required} {quote}");
        return Ok(FundingPlan {
            required,
            from_primary: required,
            from_secondary: Decimal::ZERO,
        });
    }

    let shortfall = required - free;
    tracing::info!("⚠️ spot balance is {shortfall} {quote} short, checking the earn account");

    // Shape and redeemability are checked before any sufficiency math so a
    // broken earn account never reads as "insufficient funds".
    let rows = client.flexible_position(quote).await?;
    if rows.len() != 1 {
        return Err(BotError::RedemptionAccountUnavailable {
            asset: quote.to_string(),
        });
    }
    let position = &rows[0];
    if !position.can_redeem {
        return Err(BotError::RedemptionAccountUnavailable {
            asset: quote.to_string(),
        });
    }
    tracing::info!(
        "🔎 flexible earn account holds {} {quote} redeemable",
        position.total_amount
    );

    let available = free + position.total_amount;
    if available < required {
        return Err(BotError::InsufficientFunds {
            required,
            available,
        });
    }

    if dry_run {
        tracing::info!("🧪 dry run: would redeem {shortfall} {quote} from the earn account");
    } else {
        tracing::info!("↔️ redeeming {shortfall} {quote} from the earn account");
        let ack = client
            .redeem_flexible(&position.product_id, shortfall)
            .await?;
        if !ack.success {
            return Err(BotError::RedemptionFailed {
                asset: quote.to_string(),
                amount: shortfall,
            });
        }
        tracing::info!("✅ redemption acknowledged");
    }

    Ok(FundingPlan {
        required,
        from_primary: free,
        from_secondary: shortfall,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn test_client(base_url: String) -> BinanceClient {
        BinanceClient::with_base_url("key".to_string(), "secret".to_string(), base_url).unwrap()
    }

    async fn mock_free_balance(server: &mut ServerGuard, free: &str) {
        server
            .mock("GET", "/api/v3/account")
            .match_query(Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"balances":[{{"asset":"USDT","free":"{free}","locked":"0"}}]}}"#
            ))
            .create_async()
            .await;
    }

    async fn mock_position(server: &mut ServerGuard, total: &str, can_redeem: bool) {
        server
            .mock("GET", "/sapi/v1/simple-earn/flexible/position")
            .match_query(Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"rows":[{{"productId":"USDT001","totalAmount":"{total}","canRedeem":{can_redeem}}}],"total":1}}"#
            ))
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn test_sufficient_primary_skips_redemption() {
        let mut server = Server::new_async().await;
        mock_free_balance(&mut server, "150").await;
        let redeem = server
            .mock("POST", "/sapi/v1/simple-earn/flexible/redeem")
            .expect(0)
            .create_async()
            .await;

        let client = test_client(server.url());
        let plan = ensure_funds(&client, "USDT", dec("100"), false).await.unwrap();

        assert!(plan.primary_only());
        assert_eq!(plan.from_primary, dec("100"));
        assert!(plan.covers_required());
        redeem.assert_async().await;
    }

    #[tokio::test]
    async fn test_waterfall_redeems_exactly_the_shortfall() {
        let mut server = Server::new_async().await;
        mock_free_balance(&mut server, "80").await;
        mock_position(&mut server, "50", true).await;
        let redeem = server
            .mock("POST", "/sapi/v1/simple-earn/flexible/redeem")
            .match_body(Matcher::Regex("productId=USDT001&amount=20&".to_string()))
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":true}"#)
            .create_async()
            .await;

        let client = test_client(server.url());
        let plan = ensure_funds(&client, "USDT", dec("100"), false).await.unwrap();

        assert_eq!(plan.from_primary, dec("80"));
        assert_eq!(plan.from_secondary, dec("20"));
        assert!(plan.covers_required());
        redeem.assert_async().await;
    }

    #[tokio::test]
    async fn test_combined_shortfall_fails_without_redeeming() {
        let mut server = Server::new_async().await;
        mock_free_balance(&mut server, "80").await;
        mock_position(&mut server, "10", true).await;
        let redeem = server
            .mock("POST", "/sapi/v1/simple-earn/flexible/redeem")
            .expect(0)
            .create_async()
            .await;

        let client = test_client(server.url());
        let result = ensure_funds(&client, "USDT", dec("100"), false).await;

        assert!(matches!(
            result,
            Err(BotError::InsufficientFunds { required, available })
                if required == dec("100") && available == dec("90")
        ));
        redeem.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_redeemable_position_fails() {
        let mut server = Server::new_async().await;
        mock_free_balance(&mut server, "80").await;
        mock_position(&mut server, "50", false).await;

        let client = test_client(server.url());
        let result = ensure_funds(&client, "USDT", dec("100"), false).await;

        assert!(matches!(
            result,
            Err(BotError::RedemptionAccountUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_position_row_fails() {
        let mut server = Server::new_async().await;
        mock_free_balance(&mut server, "80").await;
        server
            .mock("GET", "/sapi/v1/simple-earn/flexible/position")
            .match_query(Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(r#"{"rows":[],"total":0}"#)
            .create_async()
            .await;

        let client = test_client(server.url());
        let result = ensure_funds(&client, "USDT", dec("100"), false).await;

        assert!(matches!(
            result,
            Err(BotError::RedemptionAccountUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_unacknowledged_redemption_fails() {
        let mut server = Server::new_async().await;
        mock_free_balance(&mut server, "80").await;
        mock_position(&mut server, "50", true).await;
        server
            .mock("POST", "/sapi/v1/simple-earn/flexible/redeem")
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":false}"#)
            .create_async()
            .await;

        let client = test_client(server.url());
        let result = ensure_funds(&client, "USDT", dec("100"), false).await;

        assert!(matches!(
            result,
            Err(BotError::RedemptionFailed { amount, .. }) if amount == dec("20")
        ));
    }

    #[tokio::test]
    async fn test_dry_run_verifies_but_never_redeems() {
        let mut server = Server::new_async().await;
        mock_free_balance(&mut server, "80").await;
        mock_position(&mut server, "50", true).await;
        let redeem = server
            .mock("POST", "/sapi/v1/simple-earn/flexible/redeem")
            .expect(0)
            .create_async()
            .await;

        let client = test_client(server.url());
        let plan = ensure_funds(&client, "USDT", dec("100"), true).await.unwrap();

        assert_eq!(plan.from_secondary, dec("20"));
        redeem.assert_async().await;
    }
}
