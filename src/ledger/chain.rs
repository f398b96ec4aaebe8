//! On-chain ledger over Polygon JSON-RPC.

use std::time::Duration;

use alloy::network::{EthereumWallet, Network, ReceiptResponse};
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tracing::{debug, info, instrument};
use url::Url;

use super::contracts::{
    IConditionalTokens, IERC20, INegRiskAdapter, CONDITIONAL_TOKENS, NEG_RISK_ADAPTER, USDC,
};
use super::TxReceipt;
use crate::error::LedgerError;
use crate::gateway::LedgerGateway;

/// Ledger adapter backed by alloy providers.
///
/// Reads go through a plain HTTP provider. Writes are signed by the EOA.
#[derive(Debug, Clone)]
pub struct OnChainLedger {
    rpc_url: Url,
    signer: PrivateKeySigner,
    tx_timeout: Duration,
}

impl OnChainLedger {
    /// Create a ledger for the given RPC endpoint and signer.
    pub fn new(
        rpc_url: &str,
        signer: PrivateKeySigner,
        tx_timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let rpc_url = Url::parse(rpc_url).map_err(|e| LedgerError::rpc("connect", e))?;
        Ok(Self {
            rpc_url,
            signer,
            tx_timeout,
        })
    }

    /// Address that signs and pays for transactions.
    pub fn eoa(&self) -> Address {
        self.signer.address()
    }

    fn reader(&self) -> impl Provider {
        ProviderBuilder::new().connect_http(self.rpc_url.clone())
    }

    fn writer(&self) -> impl Provider {
        ProviderBuilder::new()
            .wallet(EthereumWallet::from(self.signer.clone()))
            .connect_http(self.rpc_url.clone())
    }

    /// Wait for a sent transaction, bounded by the configured timeout.
    async fn confirm<N: Network>(
        &self,
        call: &'static str,
        pending: PendingTransactionBuilder<N>,
    ) -> Result<TxReceipt, LedgerError> {
        let tx_hash = *pending.tx_hash();
        debug!(call, %tx_hash, "Waiting for receipt");

        let receipt = tokio::time::timeout(self.tx_timeout, pending.get_receipt())
            .await
            .map_err(|_| LedgerError::TransactionTimeout {
                tx_hash: tx_hash.to_string(),
                seconds: self.tx_timeout.as_secs(),
            })?
            .map_err(|e| LedgerError::rpc(call, e))?;

        if !receipt.status() {
            return Err(LedgerError::TransactionFailed(format!(
                "{call} reverted in {tx_hash}"
            )));
        }

        Ok(TxReceipt {
            tx_hash: tx_hash.to_string(),
            block_number: receipt.block_number(),
        })
    }
}

#[async_trait]
impl LedgerGateway for OnChainLedger {
    async fn collateral_balance(&self, holder: Address) -> Result<U256, LedgerError> {
        let provider = self.reader();
        IERC20::new(USDC, &provider)
            .balanceOf(holder)
            .call()
            .await
            .map_err(|e| LedgerError::rpc("balanceOf", e))
    }

    async fn collateral_allowance(
        &self,
        holder: Address,
        spender: Address,
    ) -> Result<U256, LedgerError> {
        let provider = self.reader();
        IERC20::new(USDC, &provider)
            .allowance(holder, spender)
            .call()
            .await
            .map_err(|e| LedgerError::rpc("allowance", e))
    }

    async fn token_balance(&self, holder: Address, token_id: U256) -> Result<U256, LedgerError> {
        let provider = self.reader();
        IConditionalTokens::new(CONDITIONAL_TOKENS, &provider)
            .balanceOf(holder, token_id)
            .call()
            .await
            .map_err(|e| LedgerError::rpc("ctf.balanceOf", e))
    }

    async fn payout_denominator(&self, condition_id: B256) -> Result<U256, LedgerError> {
        let provider = self.reader();
        IConditionalTokens::new(CONDITIONAL_TOKENS, &provider)
            .payoutDenominator(condition_id)
            .call()
            .await
            .map_err(|e| LedgerError::rpc("payoutDenominator", e))
    }

    async fn payout_numerator(
        &self,
        condition_id: B256,
        index: usize,
    ) -> Result<U256, LedgerError> {
        let provider = self.reader();
        IConditionalTokens::new(CONDITIONAL_TOKENS, &provider)
            .payoutNumerators(condition_id, U256::from(index))
            .call()
            .await
            .map_err(|e| LedgerError::rpc("payoutNumerators", e))
    }

    #[instrument(skip(self))]
    async fn approve(&self, spender: Address, amount: U256) -> Result<TxReceipt, LedgerError> {
        let provider = self.writer();
        let pending = IERC20::new(USDC, &provider)
            .approve(spender, amount)
            .send()
            .await
            .map_err(|e| LedgerError::TransactionFailed(format!("approve: {e}")))?;

        let receipt = self.confirm("approve", pending).await?;
        info!(%spender, tx_hash = %receipt.tx_hash, "Collateral approved");
        Ok(receipt)
    }

    #[instrument(skip(self))]
    async fn redeem_positions(
        &self,
        condition_id: B256,
        amounts: [U256; 2],
    ) -> Result<TxReceipt, LedgerError> {
        let provider = self.writer();
        let pending = INegRiskAdapter::new(NEG_RISK_ADAPTER, &provider)
            .redeemPositions(condition_id, amounts.to_vec())
            .send()
            .await
            .map_err(|e| LedgerError::TransactionFailed(format!("redeemPositions: {e}")))?;

        self.confirm("redeemPositions", pending).await
    }
}
