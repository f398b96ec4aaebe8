//! In-memory ledger for unit testing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;

use super::TxReceipt;
use crate::error::LedgerError;
use crate::gateway::LedgerGateway;

/// How a mocked write should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteFailure {
    /// Transaction reverted.
    Revert,
    /// Receipt never arrived.
    Timeout,
}

#[derive(Debug, Default)]
struct LedgerState {
    collateral: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    tokens: HashMap<(Address, U256), U256>,
    payouts: HashMap<B256, (U256, [U256; 2])>,
    approvals: Vec<(Address, U256)>,
    redemptions: Vec<(B256, [U256; 2])>,
    fail_reads: bool,
    redeem_failure: Option<WriteFailure>,
    tx_count: u64,
}

/// Mock ledger for testing. Unset values read as zero.
#[derive(Debug, Clone, Default)]
pub struct MockLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl MockLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the collateral balance of a holder.
    pub fn set_collateral(&self, holder: Address, units: U256) {
        self.state.lock().unwrap().collateral.insert(holder, units);
    }

    /// Set an allowance.
    pub fn set_allowance(&self, holder: Address, spender: Address, units: U256) {
        self.state
            .lock()
            .unwrap()
            .allowances
            .insert((holder, spender), units);
    }

    /// Set an outcome token balance.
    pub fn set_token_balance(&self, holder: Address, token_id: U256, units: U256) {
        self.state
            .lock()
            .unwrap()
            .tokens
            .insert((holder, token_id), units);
    }

    /// Resolve a condition with the given payout vector.
    pub fn resolve(&self, condition_id: B256, denominator: U256, numerators: [U256; 2]) {
        self.state
            .lock()
            .unwrap()
            .payouts
            .insert(condition_id, (denominator, numerators));
    }

    /// Make every read fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    /// Make redemptions fail.
    pub fn set_redeem_failure(&self, failure: Option<WriteFailure>) {
        self.state.lock().unwrap().redeem_failure = failure;
    }

    /// Approvals sent so far.
    pub fn approvals(&self) -> Vec<(Address, U256)> {
        self.state.lock().unwrap().approvals.clone()
    }

    /// Redemptions sent so far.
    pub fn redemptions(&self) -> Vec<(B256, [U256; 2])> {
        self.state.lock().unwrap().redemptions.clone()
    }

    fn read<T>(&self, call: &'static str, f: impl FnOnce(&LedgerState) -> T) -> Result<T, LedgerError> {
        let state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(LedgerError::rpc(call, "mock read failure"));
        }
        Ok(f(&state))
    }
}

fn next_receipt(state: &mut LedgerState) -> TxReceipt {
    state.tx_count += 1;
    TxReceipt {
        tx_hash: format!("{:#066x}", state.tx_count),
        block_number: Some(state.tx_count),
    }
}

#[async_trait]
impl LedgerGateway for MockLedger {
    async fn collateral_balance(&self, holder: Address) -> Result<U256, LedgerError> {
        self.read("balanceOf", |s| {
            s.collateral.get(&holder).copied().unwrap_or_default()
        })
    }

    async fn collateral_allowance(
        &self,
        holder: Address,
        spender: Address,
    ) -> Result<U256, LedgerError> {
        self.read("allowance", |s| {
            s.allowances
                .get(&(holder, spender))
                .copied()
                .unwrap_or_default()
        })
    }

    async fn token_balance(&self, holder: Address, token_id: U256) -> Result<U256, LedgerError> {
        self.read("ctf.balanceOf", |s| {
            s.tokens.get(&(holder, token_id)).copied().unwrap_or_default()
        })
    }

    async fn payout_denominator(&self, condition_id: B256) -> Result<U256, LedgerError> {
        self.read("payoutDenominator", |s| {
            s.payouts
                .get(&condition_id)
                .map(|(den, _)| *den)
                .unwrap_or_default()
        })
    }

    async fn payout_numerator(
        &self,
        condition_id: B256,
        index: usize,
    ) -> Result<U256, LedgerError> {
        self.read("payoutNumerators", |s| {
            s.payouts
                .get(&condition_id)
                .and_then(|(_, nums)| nums.get(index).copied())
                .unwrap_or_default()
        })
    }

    async fn approve(&self, spender: Address, amount: U256) -> Result<TxReceipt, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.approvals.push((spender, amount));
        Ok(next_receipt(&mut state))
    }

    async fn redeem_positions(
        &self,
        condition_id: B256,
        amounts: [U256; 2],
    ) -> Result<TxReceipt, LedgerError> {
        let mut state = self.state.lock().unwrap();
        match state.redeem_failure {
            Some(WriteFailure::Revert) => Err(LedgerError::TransactionFailed(
                "redeemPositions reverted".to_string(),
            )),
            Some(WriteFailure::Timeout) => Err(LedgerError::TransactionTimeout {
                tx_hash: "0xpending".to_string(),
                seconds: 120,
            }),
            None => {
                state.redemptions.push((condition_id, amounts));
                Ok(next_receipt(&mut state))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unset_values_read_as_zero() {
        let ledger = MockLedger::new();
        assert_eq!(
            ledger.collateral_balance(Address::ZERO).await.unwrap(),
            U256::ZERO
        );
        assert_eq!(
            ledger.payout_denominator(B256::ZERO).await.unwrap(),
            U256::ZERO
        );
    }

    #[tokio::test]
    async fn failing_reads_error() {
        let ledger = MockLedger::new();
        ledger.set_fail_reads(true);
        assert!(ledger.token_balance(Address::ZERO, U256::from(1)).await.is_err());
    }
}
