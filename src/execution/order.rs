use rust_decimal::Decimal;
use uuid::Uuid;

use crate::api::BinanceClient;
use crate::error::{BotError, Result};
use crate::models::{truncate_to_increment, MarketConstraint, OrderIntent, OrderResult};

/// Convert a quote-currency spend portion and a chosen price into an order
/// quantity truncated to the pair's lot size.
///
/// Truncation guarantees `quantity * price <= spend`. `price` must be
/// positive.
pub fn compute_quantity(spend: Decimal, price: Decimal, quantity_increment: Decimal) -> Decimal {
    debug_assert!(price > Decimal::ZERO);
    truncate_to_increment(spend / price, quantity_increment)
}

/// Size the order for one asset. Undersized quantities are not rejected
/// here; the exchange stays the single enforcer of its own minimum, but the
/// operator gets a clean signal ahead of the inevitable rejection.
pub fn build_intent(
    asset: &str,
    spend: Decimal,
    price: Decimal,
    constraint: &MarketConstraint,
) -> OrderIntent {
    let quantity = compute_quantity(spend, price, constraint.quantity_increment);

    if quantity < constraint.min_quantity {
        tracing::warn!(
            "⚠️ computed quantity {} {} is below the pair minimum {}; the exchange will reject this order",
            quantity,
            asset,
            constraint.min_quantity
        );
    }

    OrderIntent {
        asset: asset.to_string(),
        price,
        quantity,
    }
}

/// Submit one limit-maker buy. An acknowledgment without an order id means
/// the order never reached the book.
pub async fn submit(
    client: &BinanceClient,
    quote: &str,
    intent: &OrderIntent,
) -> Result<OrderResult> {
    let symbol = format!("{}{}", intent.asset, quote);
    let client_order_id = Uuid::new_v4().simple().to_string();

    let ack = client
        .place_limit_maker_buy(&symbol, intent.price, intent.quantity, &client_order_id)
        .await?;

    match ack.order_id {
        Some(order_id) => Ok(OrderResult { order_id }),
        None => Err(BotError::OrderRejected { symbol }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_quantity_truncates_to_step() {
        // 60 / 29940 = 0.0020040..., truncated to a 0.00001 step
        let quantity = compute_quantity(dec("60"), dec("29940"), dec("0.00001"));
        assert_eq!(quantity, dec("0.002"));
    }

    #[test]
    fn test_quantity_cost_never_exceeds_spend() {
        let cases = [
            ("100", "97.8", "0.001"),
            ("40", "2005.98", "0.0001"),
            ("13.37", "0.07", "1"),
            ("250", "3.333", "0.01"),
        ];
        for (spend, price, step) in cases {
            let quantity = compute_quantity(dec(spend), dec(price), dec(step));
            assert!(
                quantity * dec(price) <= dec(spend),
                "buying {} at {} costs more than {}",
                quantity,
                price,
                spend
            );
            assert_eq!(quantity % dec(step), Decimal::ZERO);
        }
    }

    #[test]
    fn test_quantity_exact_division() {
        let quantity = compute_quantity(dec("100"), dec("50"), dec("0.1"));
        assert_eq!(quantity, dec("2"));
    }

    #[test]
    fn test_build_intent_keeps_undersized_quantity() {
        let constraint = MarketConstraint {
            price_increment: dec("0.01"),
            quantity_increment: dec("0.001"),
            min_quantity: dec("1"),
        };

        // 5 / 100 = 0.05, well under the minimum of 1; the intent still
        // carries it and the exchange gets the final say
        let intent = build_intent("BNB", dec("5"), dec("100"), &constraint);
        assert_eq!(intent.quantity, dec("0.05"));
    }

    #[tokio::test]
    async fn test_submit_returns_order_id() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/api/v3/order")
            .match_body(Matcher::Regex(
                "symbol=BTCUSDT&side=BUY&type=LIMIT_MAKER&quantity=0\\.002&price=29940&newClientOrderId=".to_string(),
            ))
            .with_header("content-type", "application/json")
            .with_body(r#"{"symbol":"BTCUSDT","orderId":12345,"status":"NEW"}"#)
            .create_async()
            .await;

        let client = BinanceClient::with_base_url(
            "key".to_string(),
            "secret".to_string(),
            server.url(),
        )
        .unwrap();
        let intent = OrderIntent {
            asset: "BTC".to_string(),
            price: dec("29940"),
            quantity: dec("0.002"),
        };

        let result = submit(&client, "USDT", &intent).await.unwrap();
        assert_eq!(result.order_id, 12345);
    }

    #[tokio::test]
    async fn test_submit_without_order_id_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/api/v3/order")
            .with_header("content-type", "application/json")
            .with_body(r#"{"symbol":"BTCUSDT","status":"EXPIRED"}"#)
            .create_async()
            .await;

        let client = BinanceClient::with_base_url(
            "key".to_string(),
            "secret".to_string(),
            server.url(),
        )
        .unwrap();
        let intent = OrderIntent {
            asset: "BTC".to_string(),
            price: dec("29940"),
            quantity: dec("0.002"),
        };

        let result = submit(&client, "USDT", &intent).await;
        assert!(matches!(
            result,
            Err(BotError::OrderRejected { symbol }) if symbol == "BTCUSDT"
        ));
    }
}
