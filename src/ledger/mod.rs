//! Ledger module: collateral, outcome tokens and payouts on Polygon.
//!
//! This module handles:
//! - Contract bindings and addresses
//! - The alloy-backed [`OnChainLedger`]
//! - Paper and mock ledgers
//! - Collateral allowance bootstrap

pub mod chain;
pub mod contracts;
pub mod mock;
pub mod paper;
pub mod units;

use alloy::primitives::{Address, U256};
use serde::Serialize;
use tracing::{debug, info, instrument};

pub use crate::gateway::LedgerGateway;
pub use chain::OnChainLedger;
pub use mock::{MockLedger, WriteFailure};
pub use paper::PaperLedger;

use crate::error::LedgerError;

/// Confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxReceipt {
    /// Transaction hash.
    pub tx_hash: String,
    /// Block the transaction landed in.
    pub block_number: Option<u64>,
}

/// Allowance below which a spender is re-approved: 10^18 base units.
pub fn allowance_floor() -> U256 {
    U256::from(10u64).pow(U256::from(18u64))
}

/// Approve every spender whose allowance from `holder` is below the floor.
///
/// Returns the receipts of approvals sent.
#[instrument(skip(ledger, spenders))]
pub async fn ensure_allowances<L>(
    ledger: &L,
    holder: Address,
    spenders: &[Address],
) -> Result<Vec<TxReceipt>, LedgerError>
where
    L: LedgerGateway + ?Sized,
{
    let floor = allowance_floor();
    let mut receipts = Vec::new();

    for spender in spenders {
        let allowance = ledger.collateral_allowance(holder, *spender).await?;
        if allowance >= floor {
            debug!(%spender, %allowance, "Allowance sufficient");
            continue;
        }

        info!(%spender, "Approving collateral spender");
        receipts.push(ledger.approve(*spender, U256::MAX).await?);
    }

    Ok(receipts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::contracts::COLLATERAL_SPENDERS;

    #[tokio::test]
    async fn approves_only_spenders_below_floor() {
        let ledger = MockLedger::new();
        let holder = Address::repeat_byte(1);
        let [exchange, adapter] = COLLATERAL_SPENDERS;
        ledger.set_allowance(holder, exchange, U256::MAX);
        ledger.set_allowance(holder, adapter, U256::from(5u64));

        let receipts = ensure_allowances(&ledger, holder, &COLLATERAL_SPENDERS)
            .await
            .unwrap();

        assert_eq!(receipts.len(), 1);
        assert_eq!(ledger.approvals(), vec![(adapter, U256::MAX)]);
    }

    #[tokio::test]
    async fn read_failure_propagates() {
        let ledger = MockLedger::new();
        ledger.set_fail_reads(true);
        assert!(ensure_allowances(&ledger, Address::ZERO, &COLLATERAL_SPENDERS)
            .await
            .is_err());
    }
}
