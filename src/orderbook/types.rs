//! Order book and quote types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Single price level in an order book.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceLevel {
    /// Price at this level.
    pub price: Decimal,
    /// Total size available at this price.
    pub size: Decimal,
}

impl PriceLevel {
    /// Create a new price level.
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

/// L2 order book for one outcome token.
///
/// Levels are kept in whatever order the exchange sent them. The best
/// prices are found by scanning, so either ordering works.
#[derive(Debug, Clone)]
pub struct OutcomeBook {
    /// Token ID this book represents.
    pub token_id: String,
    /// Bid levels.
    pub bids: Vec<PriceLevel>,
    /// Ask levels.
    pub asks: Vec<PriceLevel>,
    /// When this book was fetched.
    pub updated_at: OffsetDateTime,
}

impl Default for OutcomeBook {
    fn default() -> Self {
        Self {
            token_id: String::new(),
            bids: Vec::new(),
            asks: Vec::new(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }
}

impl OutcomeBook {
    /// Highest bid price among levels with size.
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids
            .iter()
            .filter(|l| l.size > Decimal::ZERO)
            .map(|l| l.price)
            .max()
    }

    /// Lowest ask price among levels with size.
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks
            .iter()
            .filter(|l| l.size > Decimal::ZERO)
            .map(|l| l.price)
            .min()
    }
}

/// Price view of a token with at least one side of liquidity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceSnapshot {
    /// Mid price, or the single available side.
    pub price: Decimal,
    /// Best ask.
    pub best_ask: Option<Decimal>,
    /// Best bid.
    pub best_bid: Option<Decimal>,
}

/// Result of evaluating a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Quote {
    /// At least one side of the book has liquidity.
    Priced(PriceSnapshot),
    /// The book exists but both sides are empty.
    NoLiquidity,
    /// The exchange no longer has a book: the market resolved.
    Settled,
    /// The book could not be read. Treated like [`Quote::NoLiquidity`].
    GatewayError(String),
}

impl Quote {
    /// The snapshot if priced.
    pub fn snapshot(&self) -> Option<&PriceSnapshot> {
        match self {
            Quote::Priced(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    /// `(price, best_ask, best_bid)`, all absent unless priced.
    pub fn as_triple(&self) -> (Option<Decimal>, Option<Decimal>, Option<Decimal>) {
        match self {
            Quote::Priced(s) => (Some(s.price), s.best_ask, s.best_bid),
            _ => (None, None, None),
        }
    }

    /// Whether the market behind the token has resolved.
    pub fn is_settled(&self) -> bool {
        matches!(self, Quote::Settled)
    }
}

impl std::fmt::Display for Quote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn side(value: Option<Decimal>) -> String {
            value.map_or_else(|| "-".to_string(), |v| v.to_string())
        }

        match self {
            Quote::Priced(s) => write!(
                f,
                "{} (ask {} / bid {})",
                s.price,
                side(s.best_ask),
                side(s.best_bid)
            ),
            Quote::NoLiquidity => f.write_str("no liquidity"),
            Quote::Settled => f.write_str("settled"),
            Quote::GatewayError(reason) => write!(f, "unavailable ({})", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn price_level_creation() {
        let level = PriceLevel::new(dec!(0.50), dec!(100));
        assert_eq!(level.price, dec!(0.50));
        assert_eq!(level.size, dec!(100));
    }

    #[test]
    fn best_prices_ignore_ordering() {
        let book = OutcomeBook {
            token_id: "test".to_string(),
            bids: vec![
                PriceLevel::new(dec!(0.47), dec!(100)),
                PriceLevel::new(dec!(0.48), dec!(50)),
            ],
            asks: vec![
                PriceLevel::new(dec!(0.51), dec!(100)),
                PriceLevel::new(dec!(0.50), dec!(50)),
            ],
            ..Default::default()
        };

        assert_eq!(book.best_bid(), Some(dec!(0.48)));
        assert_eq!(book.best_ask(), Some(dec!(0.50)));
    }

    #[test]
    fn zero_size_levels_are_ignored() {
        let book = OutcomeBook {
            token_id: "test".to_string(),
            bids: vec![PriceLevel::new(dec!(0.60), dec!(0))],
            asks: vec![
                PriceLevel::new(dec!(0.40), dec!(0)),
                PriceLevel::new(dec!(0.55), dec!(10)),
            ],
            ..Default::default()
        };

        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), Some(dec!(0.55)));
    }

    #[test]
    fn only_missing_books_are_settled() {
        assert!(Quote::Settled.is_settled());
        assert!(!Quote::NoLiquidity.is_settled());
        assert!(!Quote::GatewayError("timeout".to_string()).is_settled());
    }

    #[test]
    fn triple_is_empty_unless_priced() {
        assert_eq!(Quote::Settled.as_triple(), (None, None, None));
        let quote = Quote::Priced(PriceSnapshot {
            price: dec!(0.8),
            best_ask: Some(dec!(0.9)),
            best_bid: Some(dec!(0.7)),
        });
        assert_eq!(
            quote.as_triple(),
            (Some(dec!(0.8)), Some(dec!(0.9)), Some(dec!(0.7)))
        );
    }
}
