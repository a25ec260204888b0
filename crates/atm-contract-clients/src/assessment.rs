use crate::common::tx_submitter::TransactionSubmitter;
use alloy::{
    primitives::{Address, B256, U256},
    providers::Provider,
    sol,
};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;

sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    contract Assessment {
        error InsufficientBalance(uint256 balance, uint256 withdrawAmount);

        event Deposit(uint256 amount);
        event Withdraw(uint256 amount);

        function getBalance() external view returns (uint256);
        function deposit(uint256 _amount) external payable;
        function withdraw(uint256 _withdrawAmount) external;
    }
}

use Assessment::AssessmentInstance;

/// Client for the ATM `Assessment` contract, bound to one sending account.
#[derive(Clone)]
pub struct AssessmentClient<P: Provider + Clone> {
    provider: P,
    contract: AssessmentInstance<P>,
    account: Address,
    submitter: TransactionSubmitter<Assessment::AssessmentErrors>,
}

impl<P: Provider + Clone> AssessmentClient<P> {
    pub fn new(
        provider: P,
        address: Address,
        account: Address,
        tx_lock: Arc<Mutex<()>>,
        confirmations: u64,
    ) -> Self {
        let contract = AssessmentInstance::new(address, provider.clone());
        let submitter = TransactionSubmitter::new(tx_lock, confirmations);
        Self {
            provider,
            contract,
            account,
            submitter,
        }
    }

    /// Get the contract address.
    pub fn address(&self) -> Address {
        *self.contract.address()
    }

    /// Account every call is sent from.
    pub fn account(&self) -> Address {
        self.account
    }

    // ------------------------------------------------------------------------
    // View Functions
    // ------------------------------------------------------------------------

    /// Current balance held by the contract.
    pub async fn get_balance(&self) -> Result<U256> {
        Ok(self.contract.getBalance().from(self.account).call().await?)
    }

    // ------------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------------

    /// Broadcast a deposit without waiting for it to be mined.
    pub async fn submit_deposit(&self, amount: U256) -> Result<B256> {
        let call = self.contract.deposit(amount).from(self.account);
        self.submitter.submit("deposit", call).await
    }

    /// Broadcast a withdrawal without waiting for it to be mined.
    pub async fn submit_withdraw(&self, amount: U256) -> Result<B256> {
        let call = self.contract.withdraw(amount).from(self.account);
        self.submitter.submit("withdraw", call).await
    }

    /// Wait for a previously submitted transaction to be mined successfully.
    pub async fn wait_for_confirmation(&self, method: &str, tx_hash: B256) -> Result<B256> {
        let receipt = self.submitter.confirm(&self.provider, method, tx_hash).await?;
        Ok(receipt.transaction_hash)
    }
}
