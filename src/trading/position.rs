//! Position tracking and the trading state owned by the control loop.

use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;

use crate::market::Outcome;

/// Position opened by an accepted buy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Position {
    /// Token ID.
    pub token_id: String,
    /// Outcome label as listed.
    pub label: String,
    /// Payout slot of the outcome.
    pub slot: Outcome,
    /// Limit price paid.
    pub price: Decimal,
    /// Shares bought.
    pub shares: Decimal,
    /// CTF condition id of the market.
    pub condition_id: String,
    /// Market ID.
    pub market_id: String,
    /// When the order was accepted.
    #[serde(with = "time::serde::rfc3339")]
    pub opened_at: OffsetDateTime,
}

impl Position {
    /// Calculate the cost basis.
    pub fn cost_basis(&self) -> Decimal {
        self.size_price()
    }

    fn size_price(&self) -> Decimal {
        self.shares * self.price
    }
}

/// Open positions keyed by token id.
#[derive(Debug, Clone, Default)]
pub struct PositionLedger {
    positions: BTreeMap<String, Position>,
}

impl PositionLedger {
    /// Number of open positions.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether no position is open.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Look up a position.
    pub fn get(&self, token_id: &str) -> Option<&Position> {
        self.positions.get(token_id)
    }

    /// Iterate positions in token order.
    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Token ids of open positions.
    pub fn token_ids(&self) -> Vec<String> {
        self.positions.keys().cloned().collect()
    }

    /// Total cost of open positions.
    pub fn total_cost_basis(&self) -> Decimal {
        self.positions.values().map(Position::cost_basis).sum()
    }

    fn insert(&mut self, position: Position) {
        self.positions.insert(position.token_id.clone(), position);
    }

    fn remove(&mut self, token_id: &str) -> Option<Position> {
        self.positions.remove(token_id)
    }
}

/// Everything the bot remembers. Lost on restart.
///
/// The bought-set only grows. It is the only guard against buying a token
/// twice, and a position exists for a token only if the token is in it.
#[derive(Debug, Clone, Default)]
pub struct TradingState {
    bought: HashSet<String>,
    positions: PositionLedger,
    cumulative_profit: Decimal,
}

impl TradingState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the token was ever bought.
    pub fn is_bought(&self, token_id: &str) -> bool {
        self.bought.contains(token_id)
    }

    /// Number of tokens ever bought.
    pub fn bought_count(&self) -> usize {
        self.bought.len()
    }

    /// Open positions.
    pub fn positions(&self) -> &PositionLedger {
        &self.positions
    }

    /// Realized profit since start.
    pub fn cumulative_profit(&self) -> Decimal {
        self.cumulative_profit
    }

    /// Record an accepted buy: mark the token bought and open the position.
    pub fn record_buy(&mut self, position: Position) {
        self.bought.insert(position.token_id.clone());
        self.positions.insert(position);
    }

    /// Close a position, adding `profit` (negative for losses) to the total.
    pub fn close_position(&mut self, token_id: &str, profit: Decimal) -> Option<Position> {
        let position = self.positions.remove(token_id)?;
        self.cumulative_profit += profit;
        Some(position)
    }
}
