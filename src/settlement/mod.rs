//! Settlement reconciler.
//!
//! Walks the open positions once per pass. A position whose order book is gone
//! is checked on-chain: unresolved conditions wait, losing outcomes are written
//! off, and winning outcomes are redeemed for collateral.
//!
//! ```text
//! OPEN --book missing--> RESOLVING --denominator > 0--> PAID | LOST | ZERO_BALANCE --> removed
//! ```

use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::error::LedgerError;
use crate::gateway::{ExchangeGateway, LedgerGateway};
use crate::ledger::units::{from_base_units, parse_condition_id, parse_token_id};
use crate::metrics;
use crate::orderbook::evaluate_quote;
use crate::trading::{Position, TradingState};

/// How a settled position was closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Settlement {
    /// Redeemed for a payout.
    Paid {
        /// Collateral received.
        revenue: Decimal,
        /// Revenue minus cost basis.
        profit: Decimal,
        /// Redemption transaction.
        tx_hash: String,
    },
    /// Resolved against the position.
    Lost {
        /// Cost basis written off.
        loss: Decimal,
    },
    /// Winning outcome with no tokens left to redeem.
    ZeroBalance,
}

/// Summary of one reconcile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Positions looked at.
    pub checked: usize,
    /// Positions whose market still trades.
    pub open: usize,
    /// Settled markets not yet resolved on-chain.
    pub unresolved: usize,
    /// Positions skipped for malformed ids.
    pub skipped: usize,
    /// Positions closed this pass, by token id.
    pub settled: Vec<(String, Settlement)>,
    /// Profit realized this pass.
    pub profit: Decimal,
}

impl ReconcileReport {
    /// Number of positions closed.
    pub fn closed(&self) -> usize {
        self.settled.len()
    }
}

enum Step {
    Open,
    Unresolved,
    Closed(Settlement, Decimal),
}

/// Run one reconcile pass over every open position.
///
/// `holder` is the wallet holding the outcome tokens. A remote ledger error
/// aborts the pass; positions closed before it stay closed.
#[instrument(skip_all, fields(positions = state.positions().len()))]
pub async fn reconcile<E, L>(
    state: &mut TradingState,
    exchange: &E,
    ledger: &L,
    holder: Address,
) -> Result<ReconcileReport, LedgerError>
where
    E: ExchangeGateway + ?Sized,
    L: LedgerGateway + ?Sized,
{
    let mut report = ReconcileReport::default();
    let candidates: Vec<Position> = state.positions().iter().cloned().collect();

    for position in candidates {
        report.checked += 1;

        let step = match settle_position(&position, exchange, ledger, holder).await {
            Ok(step) => step,
            Err(e) if e.is_invalid_input() => {
                error!(token_id = %position.token_id, error = %e, "Skipping position with malformed ids");
                report.skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        match step {
            Step::Open => report.open += 1,
            Step::Unresolved => report.unresolved += 1,
            Step::Closed(settlement, profit) => {
                state.close_position(&position.token_id, profit);
                report.profit += profit;
                report.settled.push((position.token_id.clone(), settlement));
            }
        }
    }

    if report.closed() > 0 {
        info!(
            closed = report.closed(),
            pass_profit = %report.profit,
            cumulative_profit = %state.cumulative_profit(),
            "Reconcile pass complete"
        );
    } else {
        debug!(checked = report.checked, "Nothing settled");
    }

    Ok(report)
}

async fn settle_position<E, L>(
    position: &Position,
    exchange: &E,
    ledger: &L,
    holder: Address,
) -> Result<Step, LedgerError>
where
    E: ExchangeGateway + ?Sized,
    L: LedgerGateway + ?Sized,
{
    let quote = evaluate_quote(exchange, &position.token_id).await;
    if !quote.is_settled() {
        return Ok(Step::Open);
    }

    let condition_id = parse_condition_id(&position.condition_id)?;
    let token_id = parse_token_id(&position.token_id)?;
    let slot = position.slot.index();

    let denominator = ledger.payout_denominator(condition_id).await?;
    if denominator.is_zero() {
        debug!(token_id = %position.token_id, "Market settled but not resolved on-chain");
        return Ok(Step::Unresolved);
    }

    let cost = position.cost_basis();
    let numerator = ledger.payout_numerator(condition_id, slot).await?;
    if numerator.is_zero() {
        info!(
            token_id = %position.token_id,
            outcome = %position.label,
            loss = %cost,
            "Position lost"
        );
        metrics::inc_claims_lost();
        return Ok(Step::Closed(Settlement::Lost { loss: cost }, -cost));
    }

    let balance = ledger.token_balance(holder, token_id).await?;
    if balance.is_zero() {
        warn!(
            token_id = %position.token_id,
            "Winning position has no balance, already redeemed"
        );
        metrics::inc_claims_zero_balance();
        return Ok(Step::Closed(Settlement::ZeroBalance, Decimal::ZERO));
    }

    let mut amounts = [U256::ZERO; 2];
    amounts[slot] = balance;
    let receipt = ledger.redeem_positions(condition_id, amounts).await?;

    // Matches the on-chain payout, truncated to base units.
    let payout = balance
        .checked_mul(numerator)
        .ok_or_else(|| LedgerError::Overflow(balance.to_string()))?
        / denominator;
    let revenue = from_base_units(payout)?;
    let profit = revenue - cost;

    info!(
        token_id = %position.token_id,
        outcome = %position.label,
        %revenue,
        %profit,
        tx_hash = %receipt.tx_hash,
        "Position redeemed"
    );
    metrics::inc_claims_paid();

    Ok(Step::Closed(
        Settlement::Paid {
            revenue,
            profit,
            tx_hash: receipt.tx_hash,
        },
        profit,
    ))
}
