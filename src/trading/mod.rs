//! Trading module for the buy trigger and order execution.
//!
//! This module handles:
//! - Order types and creation
//! - The one-shot buy trigger
//! - Live and paper order execution
//! - Position tracking

pub mod execution;
pub mod order;
pub mod paper;
pub mod position;
pub mod trigger;

pub use execution::{ClobTrader, LiveExchange};
pub use order::{OrderParams, OrderReceipt, Side, TimeInForce};
pub use paper::{PaperAccount, PaperExchange};
pub use position::{Position, PositionLedger, TradingState};
pub use trigger::{BuyOutcome, TriggerEngine, TriggerSettings};
