//! Buy trigger and order placement.
//!
//! A token is bought at most once: when its quote reaches the target price the
//! engine places one limit buy slightly above the best ask and, if the exchange
//! accepts it, records the position.

use alloy::primitives::Address;
use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, error, info, instrument, warn};

use super::order::OrderParams;
use super::position::{Position, TradingState};
use crate::config::Config;
use crate::error::{LedgerError, TradingError};
use crate::gateway::{ExchangeGateway, LedgerGateway};
use crate::ledger::units::from_base_units;
use crate::market::{Market, OutcomeToken};
use crate::metrics;
use crate::orderbook::Quote;

/// Result of one buy attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum BuyOutcome {
    /// Token was bought before. Nothing was called.
    AlreadyBought,
    /// Quote below target or without an ask.
    NotTriggered,
    /// Collateral does not cover the order.
    InsufficientFunds {
        /// Order cost.
        required: Decimal,
        /// Collateral available.
        available: Decimal,
    },
    /// Exchange refused or failed the order.
    Rejected {
        /// Reason reported.
        reason: String,
    },
    /// Order accepted and position opened.
    Bought {
        /// Exchange order ID.
        order_id: String,
        /// Limit price.
        price: Decimal,
        /// Shares ordered.
        shares: Decimal,
    },
}

/// Trigger thresholds and order sizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSettings {
    /// Minimum quote that fires a buy.
    pub target_price: Decimal,
    /// Added to the best ask for the limit price.
    pub buy_offset: Decimal,
    /// Decimal places of the limit price.
    pub price_decimals: u32,
    /// Shares per buy.
    pub fixed_shares: Decimal,
}

impl TriggerSettings {
    /// Settings from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            target_price: config.target_price,
            buy_offset: config.buy_offset,
            price_decimals: config.price_decimals,
            fixed_shares: config.fixed_shares,
        }
    }

    /// Best ask of a quote that fires the trigger.
    pub fn triggered_ask(&self, quote: &Quote) -> Option<Decimal> {
        let snapshot = quote.snapshot()?;
        let ask = snapshot.best_ask?;
        (snapshot.price >= self.target_price).then_some(ask)
    }

    /// Limit price for a given ask. Rounds half to even and is not capped.
    pub fn limit_price(&self, ask: Decimal) -> Decimal {
        (ask + self.buy_offset).round_dp(self.price_decimals)
    }
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            target_price: Decimal::new(80, 2),
            buy_offset: Decimal::new(1, 2),
            price_decimals: 2,
            fixed_shares: Decimal::new(2, 0),
        }
    }
}

/// Places one-shot buys.
#[derive(Debug, Clone, Default)]
pub struct TriggerEngine {
    settings: TriggerSettings,
}

impl TriggerEngine {
    /// Create an engine.
    pub fn new(settings: TriggerSettings) -> Self {
        Self { settings }
    }

    /// Current settings.
    pub fn settings(&self) -> &TriggerSettings {
        &self.settings
    }

    /// Try to buy `token` of `market` given its current quote.
    ///
    /// `holder` is the wallet whose collateral pays for the order. Only a
    /// failed balance read is an error; every other outcome leaves the state
    /// either untouched or with the new position recorded.
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip_all, fields(token_id = %token.token_id, outcome = %token.label))]
    pub async fn try_buy<E, L>(
        &self,
        state: &mut TradingState,
        exchange: &E,
        ledger: &L,
        holder: Address,
        market: &Market,
        token: &OutcomeToken,
        quote: &Quote,
    ) -> Result<BuyOutcome, LedgerError>
    where
        E: ExchangeGateway + ?Sized,
        L: LedgerGateway + ?Sized,
    {
        if state.is_bought(&token.token_id) {
            return Ok(BuyOutcome::AlreadyBought);
        }

        let Some(ask) = self.settings.triggered_ask(quote) else {
            debug!(%quote, "Trigger not met");
            return Ok(BuyOutcome::NotTriggered);
        };

        let price = self.settings.limit_price(ask);
        let shares = self.settings.fixed_shares;
        let cost = price * shares;

        let available = from_base_units(ledger.collateral_balance(holder).await?)?;
        if available < cost {
            warn!(%cost, %available, "Insufficient collateral, skipping buy");
            metrics::inc_insufficient_funds();
            return Ok(BuyOutcome::InsufficientFunds {
                required: cost,
                available,
            });
        }

        info!(%ask, %price, %shares, %cost, "Trigger hit, placing buy");

        let order = OrderParams::buy(token.token_id.clone(), price, shares);
        let receipt = match exchange.post_limit_buy(&order).await {
            Ok(receipt) => receipt,
            Err(TradingError::InsufficientFunds {
                required,
                available,
            }) => {
                warn!(%required, %available, "Exchange reports insufficient collateral");
                metrics::inc_insufficient_funds();
                return Ok(BuyOutcome::InsufficientFunds {
                    required,
                    available,
                });
            }
            Err(e) => {
                error!(error = %e, "Order failed");
                metrics::inc_orders_failed();
                return Ok(BuyOutcome::Rejected {
                    reason: e.to_string(),
                });
            }
        };

        state.record_buy(Position {
            token_id: token.token_id.clone(),
            label: token.label.clone(),
            slot: token.resolved_slot(),
            price,
            shares,
            condition_id: market.condition_id.clone(),
            market_id: market.id.clone(),
            opened_at: OffsetDateTime::now_utc(),
        });
        metrics::inc_orders_submitted();

        info!(
            order_id = %receipt.order_id,
            status = %receipt.status,
            market = %market.question,
            "Buy accepted"
        );

        Ok(BuyOutcome::Bought {
            order_id: receipt.order_id,
            price,
            shares,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MockLedger;
    use crate::market::{MockExchange, Outcome};
    use crate::orderbook::PriceSnapshot;
    use alloy::primitives::U256;
    use rust_decimal_macros::dec;
    use time::macros::datetime;

    const TOKEN: &str = "1001";

    fn holder() -> Address {
        Address::repeat_byte(0xaa)
    }

    fn market() -> Market {
        Market {
            id: "m1".to_string(),
            question: "Bitcoin Up or Down - November 3, 2:15PM-2:30PM ET".to_string(),
            condition_id: format!("0x{}", "ab".repeat(32)),
            tokens: vec![token()],
            active: true,
            closed: false,
            end_time: datetime!(2025-11-03 19:30:00 UTC),
        }
    }

    fn token() -> OutcomeToken {
        OutcomeToken {
            label: "Up".to_string(),
            token_id: TOKEN.to_string(),
            slot: Some(Outcome::Up),
        }
    }

    fn priced(price: Decimal, ask: Option<Decimal>) -> Quote {
        Quote::Priced(PriceSnapshot {
            price,
            best_ask: ask,
            best_bid: None,
        })
    }

    fn funded_ledger(usdc: u64) -> MockLedger {
        let ledger = MockLedger::new();
        ledger.set_collateral(holder(), U256::from(usdc * 1_000_000));
        ledger
    }

    async fn attempt(
        engine: &TriggerEngine,
        state: &mut TradingState,
        exchange: &MockExchange,
        ledger: &MockLedger,
        quote: &Quote,
    ) -> BuyOutcome {
        engine
            .try_buy(state, exchange, ledger, holder(), &market(), &token(), quote)
            .await
            .unwrap()
    }

    #[test]
    fn limit_price_adds_offset_and_rounds() {
        let settings = TriggerSettings::default();
        assert_eq!(settings.limit_price(dec!(0.85)), dec!(0.86));
        assert_eq!(settings.limit_price(dec!(0.995)), dec!(1.00));
    }

    #[test]
    fn threshold_is_inclusive() {
        let settings = TriggerSettings::default();
        assert_eq!(
            settings.triggered_ask(&priced(dec!(0.80), Some(dec!(0.81)))),
            Some(dec!(0.81))
        );
        assert_eq!(
            settings.triggered_ask(&priced(dec!(0.799999), Some(dec!(0.81)))),
            None
        );
        assert_eq!(settings.triggered_ask(&priced(dec!(0.9), None)), None);
    }

    #[test]
    fn non_priced_quotes_never_trigger() {
        let settings = TriggerSettings::default();
        assert_eq!(settings.triggered_ask(&Quote::NoLiquidity), None);
        assert_eq!(settings.triggered_ask(&Quote::Settled), None);
        assert_eq!(
            settings.triggered_ask(&Quote::GatewayError("timeout".to_string())),
            None
        );
    }

    #[tokio::test]
    async fn buys_each_token_once() {
        let engine = TriggerEngine::default();
        let mut state = TradingState::new();
        let exchange = MockExchange::new();
        let ledger = funded_ledger(100);
        let quote = priced(dec!(0.85), Some(dec!(0.85)));

        let first = attempt(&engine, &mut state, &exchange, &ledger, &quote).await;
        assert!(matches!(first, BuyOutcome::Bought { price, .. } if price == dec!(0.86)));

        for _ in 0..5 {
            let again = attempt(&engine, &mut state, &exchange, &ledger, &quote).await;
            assert_eq!(again, BuyOutcome::AlreadyBought);
        }

        let orders = exchange.posted_orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].price, dec!(0.86));
        assert_eq!(orders[0].size, dec!(2));

        let position = state.positions().get(TOKEN).unwrap();
        assert_eq!(position.cost_basis(), dec!(1.72));
        assert_eq!(position.slot, Outcome::Up);
    }

    #[tokio::test]
    async fn below_target_places_nothing() {
        let engine = TriggerEngine::default();
        let mut state = TradingState::new();
        let exchange = MockExchange::new();
        let ledger = funded_ledger(100);

        let outcome = attempt(
            &engine,
            &mut state,
            &exchange,
            &ledger,
            &priced(dec!(0.799999), Some(dec!(0.81))),
        )
        .await;

        assert_eq!(outcome, BuyOutcome::NotTriggered);
        assert!(exchange.posted_orders().is_empty());
        assert!(!state.is_bought(TOKEN));
    }

    #[tokio::test]
    async fn gateway_error_quote_never_triggers() {
        let engine = TriggerEngine::default();
        let mut state = TradingState::new();
        let exchange = MockExchange::new();
        let ledger = funded_ledger(100);

        let outcome = attempt(
            &engine,
            &mut state,
            &exchange,
            &ledger,
            &Quote::GatewayError("connection reset".to_string()),
        )
        .await;

        assert_eq!(outcome, BuyOutcome::NotTriggered);
        assert!(exchange.posted_orders().is_empty());
    }

    #[tokio::test]
    async fn insufficient_funds_keeps_token_eligible() {
        let engine = TriggerEngine::default();
        let mut state = TradingState::new();
        let exchange = MockExchange::new();
        let ledger = funded_ledger(1);
        let quote = priced(dec!(0.85), Some(dec!(0.85)));

        let outcome = attempt(&engine, &mut state, &exchange, &ledger, &quote).await;
        assert_eq!(
            outcome,
            BuyOutcome::InsufficientFunds {
                required: dec!(1.72),
                available: dec!(1),
            }
        );
        assert!(exchange.posted_orders().is_empty());
        assert!(!state.is_bought(TOKEN));

        ledger.set_collateral(holder(), U256::from(10_000_000u64));
        let retry = attempt(&engine, &mut state, &exchange, &ledger, &quote).await;
        assert!(matches!(retry, BuyOutcome::Bought { .. }));
    }

    #[tokio::test]
    async fn rejected_order_can_be_retried() {
        let engine = TriggerEngine::default();
        let mut state = TradingState::new();
        let exchange = MockExchange::new();
        exchange.reject_next_orders(1);
        let ledger = funded_ledger(100);
        let quote = priced(dec!(0.9), Some(dec!(0.9)));

        let rejected = attempt(&engine, &mut state, &exchange, &ledger, &quote).await;
        assert!(matches!(rejected, BuyOutcome::Rejected { .. }));
        assert!(!state.is_bought(TOKEN));
        assert!(state.positions().is_empty());

        let retry = attempt(&engine, &mut state, &exchange, &ledger, &quote).await;
        assert!(matches!(retry, BuyOutcome::Bought { .. }));
        assert!(state.is_bought(TOKEN));
    }

    #[tokio::test]
    async fn balance_read_failure_propagates() {
        let engine = TriggerEngine::default();
        let mut state = TradingState::new();
        let exchange = MockExchange::new();
        let ledger = funded_ledger(100);
        ledger.set_fail_reads(true);

        let result = engine
            .try_buy(
                &mut state,
                &exchange,
                &ledger,
                holder(),
                &market(),
                &token(),
                &priced(dec!(0.9), Some(dec!(0.9))),
            )
            .await;

        assert!(result.is_err());
        assert!(exchange.posted_orders().is_empty());
        assert!(!state.is_bought(TOKEN));
    }
}
