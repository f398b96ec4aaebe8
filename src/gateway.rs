//! Seams between the trading core and the outside world.
//!
//! The control loop and its components only talk to these traits. Live
//! adapters live in [`crate::market::client`], [`crate::trading::execution`]
//! and [`crate::ledger::chain`]. Paper and mock adapters implement the same
//! traits for dry runs and tests.

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;

use crate::error::{LedgerError, MarketError, TradingError};
use crate::ledger::TxReceipt;
use crate::market::discovery::MarketQuery;
use crate::market::types::GammaMarket;
use crate::orderbook::OutcomeBook;
use crate::trading::{OrderParams, OrderReceipt};

/// Order book reads and order submission.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Fetch the order book of a token.
    ///
    /// A token whose market resolved has no book and must yield
    /// [`MarketError::OrderBookMissing`].
    async fn order_book(&self, token_id: &str) -> Result<OutcomeBook, MarketError>;

    /// Submit a limit buy. `Ok` means the exchange accepted the order.
    async fn post_limit_buy(&self, order: &OrderParams) -> Result<OrderReceipt, TradingError>;
}

/// Market listing.
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// List raw market records matching the query.
    async fn list_markets(&self, query: &MarketQuery) -> Result<Vec<GammaMarket>, MarketError>;
}

/// Collateral, outcome token and payout reads plus the two writes the bot makes.
///
/// All amounts are raw 6-decimal base units.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Collateral (USDC) balance of `holder`.
    async fn collateral_balance(&self, holder: Address) -> Result<U256, LedgerError>;

    /// Collateral allowance granted by `holder` to `spender`.
    async fn collateral_allowance(
        &self,
        holder: Address,
        spender: Address,
    ) -> Result<U256, LedgerError>;

    /// Outcome token balance of `holder`.
    async fn token_balance(&self, holder: Address, token_id: U256) -> Result<U256, LedgerError>;

    /// Payout denominator of a condition. Zero until resolved.
    async fn payout_denominator(&self, condition_id: B256) -> Result<U256, LedgerError>;

    /// Payout numerator of one outcome slot.
    async fn payout_numerator(&self, condition_id: B256, index: usize)
        -> Result<U256, LedgerError>;

    /// Approve `spender` to move collateral, waiting for the receipt.
    async fn approve(&self, spender: Address, amount: U256) -> Result<TxReceipt, LedgerError>;

    /// Redeem outcome tokens of a resolved condition, waiting for the receipt.
    async fn redeem_positions(
        &self,
        condition_id: B256,
        amounts: [U256; 2],
    ) -> Result<TxReceipt, LedgerError>;
}
