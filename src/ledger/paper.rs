//! Paper ledger for dry runs.
//!
//! Balances come from the [`PaperAccount`]. Payout vectors are read from the
//! wrapped ledger so settlement follows real resolutions. Writes never touch
//! the chain.

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use tracing::info;

use super::TxReceipt;
use crate::error::LedgerError;
use crate::gateway::LedgerGateway;
use crate::trading::paper::PaperAccount;

/// Ledger that simulates balances and redemptions.
#[derive(Debug, Clone)]
pub struct PaperLedger<L> {
    payouts: L,
    account: PaperAccount,
}

impl<L> PaperLedger<L> {
    /// Wrap a ledger used for payout reads.
    pub fn new(payouts: L, account: PaperAccount) -> Self {
        Self { payouts, account }
    }
}

fn paper_receipt() -> TxReceipt {
    TxReceipt {
        tx_hash: format!("paper-{}", uuid::Uuid::new_v4()),
        block_number: None,
    }
}

#[async_trait]
impl<L: LedgerGateway> LedgerGateway for PaperLedger<L> {
    async fn collateral_balance(&self, _holder: Address) -> Result<U256, LedgerError> {
        Ok(self.account.collateral())
    }

    async fn collateral_allowance(
        &self,
        _holder: Address,
        _spender: Address,
    ) -> Result<U256, LedgerError> {
        Ok(U256::MAX)
    }

    async fn token_balance(&self, _holder: Address, token_id: U256) -> Result<U256, LedgerError> {
        Ok(self.account.holding(token_id))
    }

    async fn payout_denominator(&self, condition_id: B256) -> Result<U256, LedgerError> {
        self.payouts.payout_denominator(condition_id).await
    }

    async fn payout_numerator(
        &self,
        condition_id: B256,
        index: usize,
    ) -> Result<U256, LedgerError> {
        self.payouts.payout_numerator(condition_id, index).await
    }

    async fn approve(&self, spender: Address, _amount: U256) -> Result<TxReceipt, LedgerError> {
        info!(%spender, "[DRY RUN] Skipping approval");
        Ok(paper_receipt())
    }

    async fn redeem_positions(
        &self,
        condition_id: B256,
        amounts: [U256; 2],
    ) -> Result<TxReceipt, LedgerError> {
        let denominator = self.payouts.payout_denominator(condition_id).await?;
        if denominator.is_zero() {
            return Err(LedgerError::TransactionFailed(format!(
                "condition {condition_id} not resolved"
            )));
        }

        let mut payout = U256::ZERO;
        for (index, amount) in amounts.iter().enumerate() {
            if amount.is_zero() {
                continue;
            }
            let numerator = self.payouts.payout_numerator(condition_id, index).await?;
            payout += *amount * numerator / denominator;
        }

        self.account.credit(payout);
        info!(%condition_id, %payout, "[DRY RUN] Positions redeemed on paper");
        Ok(paper_receipt())
    }
}
