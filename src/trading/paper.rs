//! Paper trading for dry runs.
//!
//! Orders fill immediately at their limit price against a simulated
//! collateral balance. Order books still come from the live CLOB.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use alloy::primitives::U256;
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use super::order::{OrderParams, OrderReceipt};
use crate::error::{LedgerError, MarketError, TradingError};
use crate::gateway::ExchangeGateway;
use crate::ledger::units::{from_base_units, parse_token_id, to_base_units};
use crate::market::PolymarketClient;
use crate::orderbook::OutcomeBook;

#[derive(Debug, Default)]
struct PaperBook {
    collateral: U256,
    holdings: HashMap<U256, U256>,
}

/// Simulated wallet shared by the paper exchange and the paper ledger.
#[derive(Debug, Clone, Default)]
pub struct PaperAccount {
    book: Arc<Mutex<PaperBook>>,
}

impl PaperAccount {
    /// Create an account holding `balance` USDC.
    pub fn new(balance: Decimal) -> Result<Self, LedgerError> {
        let account = Self::default();
        account.lock().collateral = to_base_units(balance)?;
        Ok(account)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PaperBook> {
        self.book.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Collateral in base units.
    pub fn collateral(&self) -> U256 {
        self.lock().collateral
    }

    /// Outcome token balance in base units.
    pub fn holding(&self, token_id: U256) -> U256 {
        self.lock().holdings.get(&token_id).copied().unwrap_or_default()
    }

    /// Debit `cost` and credit `shares` of `token_id`.
    pub fn fill_buy(&self, token_id: U256, cost: U256, shares: U256) -> Result<(), TradingError> {
        let mut book = self.lock();
        if book.collateral < cost {
            return Err(TradingError::InsufficientFunds {
                required: from_base_units(cost).unwrap_or_default(),
                available: from_base_units(book.collateral).unwrap_or_default(),
            });
        }
        book.collateral -= cost;
        *book.holdings.entry(token_id).or_default() += shares;
        Ok(())
    }

    /// Add collateral from a redemption.
    pub fn credit(&self, amount: U256) {
        let mut book = self.lock();
        book.collateral = book.collateral.saturating_add(amount);
    }
}

/// Exchange that reads live books and fills orders on paper.
#[derive(Debug, Clone)]
pub struct PaperExchange {
    books: PolymarketClient,
    account: PaperAccount,
}

impl PaperExchange {
    /// Create a paper exchange.
    pub fn new(books: PolymarketClient, account: PaperAccount) -> Self {
        Self { books, account }
    }

    /// The simulated account.
    pub fn account(&self) -> &PaperAccount {
        &self.account
    }
}

#[async_trait]
impl ExchangeGateway for PaperExchange {
    async fn order_book(&self, token_id: &str) -> Result<OutcomeBook, MarketError> {
        self.books.get_order_book(token_id).await
    }

    async fn post_limit_buy(&self, order: &OrderParams) -> Result<OrderReceipt, TradingError> {
        order.validate().map_err(TradingError::InvalidParams)?;

        let token = parse_token_id(&order.token_id)
            .map_err(|_| TradingError::InvalidTokenId(order.token_id.clone()))?;
        let cost = to_base_units(order.notional())
            .map_err(|e| TradingError::InvalidParams(e.to_string()))?;
        let shares =
            to_base_units(order.size).map_err(|e| TradingError::InvalidParams(e.to_string()))?;

        self.account.fill_buy(token, cost, shares)?;

        let order_id = format!("paper-{}", Uuid::new_v4());
        info!(
            order_id = %order_id,
            token_id = %order.token_id,
            price = %order.price,
            size = %order.size,
            "[DRY RUN] Order filled on paper"
        );

        Ok(OrderReceipt {
            order_id,
            status: "matched".to_string(),
        })
    }
}
