//! Price evaluation: turning an order book into a [`Quote`].

use std::time::Instant;

use rust_decimal::Decimal;
use tracing::{debug, instrument};

use super::types::{OutcomeBook, PriceSnapshot, Quote};
use crate::error::MarketError;
use crate::gateway::ExchangeGateway;
use crate::metrics;

/// Derive a quote from a fetched book.
///
/// Mid price when both sides have liquidity, the single side otherwise.
pub fn quote_from_book(book: &OutcomeBook) -> Quote {
    let best_ask = book.best_ask();
    let best_bid = book.best_bid();

    let price = match (best_ask, best_bid) {
        (Some(ask), Some(bid)) => (ask + bid) / Decimal::TWO,
        (Some(ask), None) => ask,
        (None, Some(bid)) => bid,
        (None, None) => return Quote::NoLiquidity,
    };

    Quote::Priced(PriceSnapshot {
        price,
        best_ask,
        best_bid,
    })
}

/// Fetch the book of a token and evaluate it.
///
/// Never fails: a missing book is [`Quote::Settled`] and any other error
/// becomes [`Quote::GatewayError`].
#[instrument(skip(exchange))]
pub async fn evaluate_quote<E>(exchange: &E, token_id: &str) -> Quote
where
    E: ExchangeGateway + ?Sized,
{
    let start = Instant::now();
    let result = exchange.order_book(token_id).await;
    metrics::record_orderbook_fetch_latency(start);

    match result {
        Ok(book) => quote_from_book(&book),
        Err(MarketError::OrderBookMissing { .. }) => {
            debug!(token_id, "No order book, market settled");
            Quote::Settled
        }
        Err(e) => {
            debug!(token_id, error = %e, "Order book unavailable");
            Quote::GatewayError(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::mock::MockExchange;
    use crate::orderbook::PriceLevel;
    use rust_decimal_macros::dec;

    fn book(asks: &[Decimal], bids: &[Decimal]) -> OutcomeBook {
        OutcomeBook {
            token_id: "t".to_string(),
            asks: asks.iter().map(|p| PriceLevel::new(*p, dec!(10))).collect(),
            bids: bids.iter().map(|p| PriceLevel::new(*p, dec!(10))).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn mid_price_when_both_sides_present() {
        let quote = quote_from_book(&book(&[dec!(0.9)], &[dec!(0.7)]));
        assert_eq!(quote.as_triple(), (Some(dec!(0.8)), Some(dec!(0.9)), Some(dec!(0.7))));
    }

    #[test]
    fn ask_only_uses_ask() {
        let quote = quote_from_book(&book(&[dec!(0.95)], &[]));
        assert_eq!(quote.as_triple(), (Some(dec!(0.95)), Some(dec!(0.95)), None));
    }

    #[test]
    fn bid_only_uses_bid() {
        let quote = quote_from_book(&book(&[], &[dec!(0.42)]));
        assert_eq!(quote.as_triple(), (Some(dec!(0.42)), None, Some(dec!(0.42))));
    }

    #[test]
    fn empty_book_has_no_liquidity() {
        assert_eq!(quote_from_book(&book(&[], &[])), Quote::NoLiquidity);
    }

    #[test]
    fn unsorted_levels_pick_extremes() {
        let quote = quote_from_book(&book(
            &[dec!(0.99), dec!(0.91), dec!(0.95)],
            &[dec!(0.50), dec!(0.89), dec!(0.70)],
        ));
        assert_eq!(quote.as_triple(), (Some(dec!(0.90)), Some(dec!(0.91)), Some(dec!(0.89))));
    }

    #[tokio::test]
    async fn missing_book_is_settled() {
        let exchange = MockExchange::new();
        exchange.set_settled("resolved");

        assert_eq!(evaluate_quote(&exchange, "resolved").await, Quote::Settled);
    }

    #[tokio::test]
    async fn transport_failure_is_gateway_error() {
        let exchange = MockExchange::new();
        exchange.set_failing("flaky", "connection reset");

        let quote = evaluate_quote(&exchange, "flaky").await;
        assert!(matches!(quote, Quote::GatewayError(_)));
        assert_eq!(quote.as_triple(), (None, None, None));
    }

    #[tokio::test]
    async fn fetched_book_is_priced() {
        let exchange = MockExchange::new();
        exchange.set_book("live", &[dec!(0.9)], &[dec!(0.7)]);

        let quote = evaluate_quote(&exchange, "live").await;
        assert_eq!(quote.snapshot().map(|s| s.price), Some(dec!(0.8)));
    }
}
