use alloy::{
    contract::{CallBuilder, CallDecoder},
    primitives::B256,
    providers::{PendingTransactionBuilder, Provider},
    rpc::types::TransactionReceipt,
    sol_types::SolInterface,
};
use anyhow::{Context, Result, anyhow, bail};
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::errors::decode_contract_error;

/// Sends contract calls and waits for them to be mined.
///
/// Submission and confirmation are separate steps so callers can track the
/// transaction between the two. Sends are serialized through `tx_lock` to keep
/// nonces in order when several clients share one account.
pub struct TransactionSubmitter<S> {
    tx_lock: Arc<Mutex<()>>,
    confirmations: u64,
    _decoder: PhantomData<S>,
}

impl<S> Clone for TransactionSubmitter<S> {
    fn clone(&self) -> Self {
        Self {
            tx_lock: self.tx_lock.clone(),
            confirmations: self.confirmations,
            _decoder: PhantomData,
        }
    }
}

impl<S: SolInterface + Debug> TransactionSubmitter<S> {
    pub fn new(tx_lock: Arc<Mutex<()>>, confirmations: u64) -> Self {
        Self {
            tx_lock,
            confirmations: confirmations.max(1),
            _decoder: PhantomData,
        }
    }

    /// Simulate, then broadcast `call`. Returns the transaction hash as soon as
    /// the provider accepted it.
    pub async fn submit<P, D>(&self, method: &str, call: CallBuilder<P, D>) -> Result<B256>
    where
        P: Provider + Clone,
        D: CallDecoder + Clone,
    {
        // Pre-simulate to catch reverts with proper error messages
        if let Err(e) = call.call().await {
            let e = decode_contract_error::<S>(e);
            return Err(anyhow!("{method} reverted: {e}"));
        }

        let _guard = self.tx_lock.lock().await;
        let pending = call.send().await.map_err(|e| {
            let e = decode_contract_error::<S>(e);
            anyhow!("{method} failed to send: {e}")
        })?;

        let tx_hash = *pending.tx_hash();
        info!(method = %method, tx_hash = ?tx_hash, "📤 transaction submitted");
        Ok(tx_hash)
    }

    /// Wait until `tx_hash` has the configured number of confirmations and
    /// check that it did not revert.
    pub async fn confirm<P>(
        &self,
        provider: &P,
        method: &str,
        tx_hash: B256,
    ) -> Result<TransactionReceipt>
    where
        P: Provider + Clone,
    {
        let receipt = PendingTransactionBuilder::new(provider.root().clone(), tx_hash)
            .with_required_confirmations(self.confirmations)
            .get_receipt()
            .await
            .with_context(|| format!("{method} was not confirmed. Tx hash: {tx_hash:?}"))?;

        Self::log_gas_details(method, &receipt);

        if !receipt.status() {
            bail!("{method} reverted on-chain. Tx hash: {tx_hash:?}");
        }

        Ok(receipt)
    }

    fn log_gas_details(method: &str, receipt: &TransactionReceipt) {
        let total_cost = receipt.effective_gas_price * receipt.gas_used as u128;
        info!(
            method = %method,
            tx_hash = ?receipt.transaction_hash,
            block_number = ?receipt.block_number,
            effective_gas_price = receipt.effective_gas_price,
            gas_used = receipt.gas_used,
            total_cost,
            "💰 transaction gas details"
        );
    }
}
