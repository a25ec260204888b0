use alloy::primitives::{Address, B256, U256};
use alloy::providers::Provider;
use async_trait::async_trait;
use atm_contract_clients::AssessmentClient;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::error::AtmError;
use crate::transaction::TxKind;
use crate::wallet::WalletProvider;

/// Signing-capable handle on the ATM contract for one account.
#[async_trait]
pub trait AtmContract: Send + Sync {
    fn address(&self) -> Address;

    fn account(&self) -> Address;

    /// Read-only balance query.
    async fn balance(&self) -> anyhow::Result<U256>;

    /// Broadcast a mutating call and return its hash without waiting for it
    /// to be mined.
    async fn submit(&self, kind: TxKind, amount: U256) -> anyhow::Result<B256>;

    /// Wait until `tx_hash` is mined and succeeded.
    async fn confirm(&self, kind: TxKind, tx_hash: B256) -> anyhow::Result<()>;
}

#[async_trait]
impl<P: Provider + Clone + 'static> AtmContract for AssessmentClient<P> {
    fn address(&self) -> Address {
        AssessmentClient::address(self)
    }

    fn account(&self) -> Address {
        AssessmentClient::account(self)
    }

    async fn balance(&self) -> anyhow::Result<U256> {
        self.get_balance().await
    }

    async fn submit(&self, kind: TxKind, amount: U256) -> anyhow::Result<B256> {
        match kind {
            TxKind::Deposit => self.submit_deposit(amount).await,
            TxKind::Withdraw => self.submit_withdraw(amount).await,
        }
    }

    async fn confirm(&self, kind: TxKind, tx_hash: B256) -> anyhow::Result<()> {
        self.wait_for_confirmation(kind.method(), tx_hash).await?;
        Ok(())
    }
}

/// The fixed ATM contract bound to the connected account.
///
/// Holds no contract state of its own. A new session is opened every time the
/// account changes.
#[derive(Clone)]
pub struct ContractSession {
    account: Address,
    wallet: String,
    contract: Arc<dyn AtmContract>,
}

impl ContractSession {
    /// Bind `contract_address` to a signer derived from `provider` for
    /// `account`. Fails when no account is connected.
    pub fn open(
        provider: &dyn WalletProvider,
        account: Option<Address>,
        contract_address: Address,
    ) -> Result<Self, AtmError> {
        let account = account.ok_or(AtmError::SessionUnavailable)?;
        let contract = provider.contract(contract_address, account);

        info!(
            wallet = %provider.name(),
            account = %account,
            contract = %contract.address(),
            "Contract session opened"
        );

        Ok(Self {
            account,
            wallet: provider.name().to_string(),
            contract,
        })
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn contract_address(&self) -> Address {
        self.contract.address()
    }

    pub fn wallet(&self) -> &str {
        &self.wallet
    }

    pub(crate) fn contract(&self) -> &dyn AtmContract {
        self.contract.as_ref()
    }
}

impl fmt::Debug for ContractSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractSession")
            .field("account", &self.account)
            .field("wallet", &self.wallet)
            .field("contract", &self.contract.address())
            .finish()
    }
}
