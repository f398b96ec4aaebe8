//! Market module for BTC 15-minute prediction markets.
//!
//! This module handles:
//! - Market types and the raw Gamma listing record
//! - Market discovery (eligible markets ending within the window)
//! - Polymarket REST client (order books, listing, proxy wallet lookup)
//! - Mock gateways for testing

pub mod client;
pub mod discovery;
pub mod mock;
pub mod types;

pub use client::PolymarketClient;
pub use discovery::{discover_markets, MarketFilter, MarketQuery};
pub use mock::{MockExchange, MockMarketSource, MockOrderBookBuilder};
pub use types::{GammaMarket, Market, Outcome, OutcomeToken};
