//! Mock exchange and market listing for unit testing.
//!
//! This module provides mock gateways that can be used in tests
//! without making real network requests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::error::{MarketError, TradingError};
use crate::gateway::{ExchangeGateway, MarketSource};
use crate::market::discovery::MarketQuery;
use crate::market::types::{GammaMarket, IdRepr, StringList};
use crate::orderbook::types::{OutcomeBook, PriceLevel};
use crate::trading::{OrderParams, OrderReceipt};

/// What the mock returns for a token's book.
#[derive(Debug, Clone)]
pub enum MockBook {
    /// A live book.
    Levels(OutcomeBook),
    /// The market resolved: no book.
    Settled,
    /// Transport failure with the given reason.
    Failing(String),
}

#[derive(Debug, Default)]
struct ExchangeState {
    books: HashMap<String, MockBook>,
    posted: Vec<OrderParams>,
    rejections_pending: usize,
    book_requests: usize,
}

/// Mock exchange for testing.
///
/// Tokens without a configured book return an empty book.
#[derive(Debug, Clone, Default)]
pub struct MockExchange {
    state: Arc<Mutex<ExchangeState>>,
}

impl MockExchange {
    /// Create a new mock exchange.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a book with one level of size 100 per given price.
    pub fn set_book(&self, token_id: &str, asks: &[Decimal], bids: &[Decimal]) {
        let mut builder = MockOrderBookBuilder::new(token_id);
        for ask in asks {
            builder = builder.ask(*ask, Decimal::ONE_HUNDRED);
        }
        for bid in bids {
            builder = builder.bid(*bid, Decimal::ONE_HUNDRED);
        }
        self.set_order_book(builder.build());
    }

    /// Set a fully built book.
    pub fn set_order_book(&self, book: OutcomeBook) {
        let mut state = self.state.lock().unwrap();
        state.books.insert(book.token_id.clone(), MockBook::Levels(book));
    }

    /// Mark a token's market as resolved.
    pub fn set_settled(&self, token_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.books.insert(token_id.to_string(), MockBook::Settled);
    }

    /// Make book reads for a token fail.
    pub fn set_failing(&self, token_id: &str, reason: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .books
            .insert(token_id.to_string(), MockBook::Failing(reason.to_string()));
    }

    /// Reject the next `count` submitted orders.
    pub fn reject_next_orders(&self, count: usize) {
        self.state.lock().unwrap().rejections_pending = count;
    }

    /// Orders accepted so far.
    pub fn posted_orders(&self) -> Vec<OrderParams> {
        self.state.lock().unwrap().posted.clone()
    }

    /// Number of book reads served.
    pub fn book_requests(&self) -> usize {
        self.state.lock().unwrap().book_requests
    }
}

#[async_trait]
impl ExchangeGateway for MockExchange {
    async fn order_book(&self, token_id: &str) -> Result<OutcomeBook, MarketError> {
        let mut state = self.state.lock().unwrap();
        state.book_requests += 1;

        match state.books.get(token_id) {
            Some(MockBook::Levels(book)) => Ok(book.clone()),
            Some(MockBook::Settled) => Err(MarketError::OrderBookMissing {
                token_id: token_id.to_string(),
            }),
            Some(MockBook::Failing(reason)) => Err(MarketError::FetchFailed {
                resource: token_id.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(OutcomeBook {
                token_id: token_id.to_string(),
                ..Default::default()
            }),
        }
    }

    async fn post_limit_buy(&self, order: &OrderParams) -> Result<OrderReceipt, TradingError> {
        let mut state = self.state.lock().unwrap();

        if state.rejections_pending > 0 {
            state.rejections_pending -= 1;
            return Err(TradingError::OrderRejected {
                reason: "mock rejection".to_string(),
            });
        }

        state.posted.push(order.clone());
        Ok(OrderReceipt {
            order_id: format!("mock-order-{}", state.posted.len()),
            status: "matched".to_string(),
        })
    }
}

/// Builder for creating mock order books with common patterns.
pub struct MockOrderBookBuilder {
    token_id: String,
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
}

impl MockOrderBookBuilder {
    /// Create a new builder for the given token.
    pub fn new(token_id: impl Into<String>) -> Self {
        Self {
            token_id: token_id.into(),
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }

    /// Add a bid level.
    pub fn bid(mut self, price: Decimal, size: Decimal) -> Self {
        self.bids.push(PriceLevel { price, size });
        self
    }

    /// Add an ask level.
    pub fn ask(mut self, price: Decimal, size: Decimal) -> Self {
        self.asks.push(PriceLevel { price, size });
        self
    }

    /// Build the book, keeping levels in insertion order.
    pub fn build(self) -> OutcomeBook {
        OutcomeBook {
            token_id: self.token_id,
            bids: self.bids,
            asks: self.asks,
            updated_at: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, Default)]
struct SourceState {
    markets: Vec<GammaMarket>,
    fail: bool,
    queries: Vec<MarketQuery>,
}

/// Mock market listing for testing.
#[derive(Debug, Clone, Default)]
pub struct MockMarketSource {
    state: Arc<Mutex<SourceState>>,
}

impl MockMarketSource {
    /// Create an empty listing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binary market record.
    pub fn add_market(
        &self,
        id: &str,
        question: &str,
        condition_id: &str,
        token_ids: [&str; 2],
        labels: [&str; 2],
        end_time: OffsetDateTime,
    ) {
        let end_date = end_time
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap();
        let encode = |items: [&str; 2]| {
            StringList::Encoded(serde_json::to_string(&items).unwrap())
        };

        self.state.lock().unwrap().markets.push(GammaMarket {
            id: Some(IdRepr::Text(id.to_string())),
            question: Some(question.to_string()),
            condition_id: Some(condition_id.to_string()),
            clob_token_ids: Some(encode(token_ids)),
            outcomes: Some(encode(labels)),
            end_date: Some(end_date),
            active: Some(true),
            closed: Some(false),
        });
    }

    /// Add a raw record.
    pub fn add_raw(&self, market: GammaMarket) {
        self.state.lock().unwrap().markets.push(market);
    }

    /// Make listing calls fail.
    pub fn set_failing(&self, fail: bool) {
        self.state.lock().unwrap().fail = fail;
    }

    /// Queries received so far.
    pub fn queries(&self) -> Vec<MarketQuery> {
        self.state.lock().unwrap().queries.clone()
    }
}

#[async_trait]
impl MarketSource for MockMarketSource {
    async fn list_markets(&self, query: &MarketQuery) -> Result<Vec<GammaMarket>, MarketError> {
        let mut state = self.state.lock().unwrap();
        state.queries.push(query.clone());

        if state.fail {
            return Err(MarketError::FetchFailed {
                resource: "markets".to_string(),
                reason: "mock listing failure".to_string(),
            });
        }

        Ok(state.markets.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trading::OrderParams;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn unknown_token_has_empty_book() {
        let exchange = MockExchange::new();
        let book = exchange.order_book("nothing").await.unwrap();
        assert!(book.bids.is_empty());
        assert!(book.asks.is_empty());
    }

    #[tokio::test]
    async fn rejections_are_consumed_in_order() {
        let exchange = MockExchange::new();
        exchange.reject_next_orders(1);
        let order = OrderParams::buy("t", dec!(0.86), dec!(2));

        assert!(exchange.post_limit_buy(&order).await.is_err());
        assert!(exchange.post_limit_buy(&order).await.is_ok());
        assert_eq!(exchange.posted_orders().len(), 1);
    }

    #[test]
    fn builder_keeps_insertion_order() {
        let book = MockOrderBookBuilder::new("test-token")
            .bid(dec!(0.49), dec!(200))
            .bid(dec!(0.50), dec!(100))
            .ask(dec!(0.53), dec!(200))
            .ask(dec!(0.52), dec!(100))
            .build();

        assert_eq!(book.bids[0].price, dec!(0.49));
        assert_eq!(book.best_bid(), Some(dec!(0.50)));
        assert_eq!(book.best_ask(), Some(dec!(0.52)));
    }

    #[tokio::test]
    async fn failing_source_errors() {
        let source = MockMarketSource::new();
        source.set_failing(true);
        assert!(source.list_markets(&MarketQuery::default()).await.is_err());
        assert_eq!(source.queries().len(), 1);
    }
}
