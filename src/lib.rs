//! Buy-only trigger bot for BTC 15-minute Polymarket markets.
//!
//! The bot watches every bitcoin up/down market that closes within the next
//! hour. When an outcome's price reaches the target it buys a fixed number of
//! shares once, slightly above the best ask, and later redeems the winners.
//!
//! # Strategy
//!
//! Late in a 15-minute window the leading outcome usually keeps its lead. A
//! token quoted at or above the target is bought and held to resolution:
//!
//! ```text
//! UP quote:      $0.85  >= target $0.80
//! Limit price:   $0.86  (ask + $0.01)
//! Cost:          2 x $0.86 = $1.72
//! ─────────────────────
//! UP wins:       2 x $1.00 = $2.00 -> profit +$0.28
//! UP loses:      $0.00              -> profit -$1.72
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`gateway`]: Exchange, listing and ledger traits
//! - [`market`]: Market discovery and Polymarket client
//! - [`orderbook`]: Order book types and price evaluation
//! - [`trading`]: Buy trigger, order execution and positions
//! - [`ledger`]: On-chain balances, payouts and redemptions
//! - [`settlement`]: Reconciling settled positions
//! - [`bot`]: The trading control loop
//! - [`signing`]: Signers and CLOB credential derivation
//! - [`api`]: HTTP API for health/metrics
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Shutdown and pacing helpers

pub mod api;
pub mod bot;
pub mod config;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod market;
pub mod metrics;
pub mod orderbook;
pub mod settlement;
pub mod signing;
pub mod trading;
pub mod utils;

pub use bot::{Accounts, BotSettings, BotSnapshot, TradingBot};
pub use config::Config;
pub use error::{BotError, Result};
