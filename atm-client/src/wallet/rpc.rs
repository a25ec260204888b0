//! Wallet provider backed by an Ethereum JSON-RPC endpoint.
//!
//! Two backends are supported: accounts managed by the node itself (the node
//! signs `eth_sendTransaction`, as anvil does for its dev accounts) and a local
//! private key that signs before broadcasting.

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::TransportError;
use alloy::transports::http::reqwest::Url;
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use atm_contract_clients::AssessmentClient;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{ProviderDiscovery, WalletError, WalletProvider};
use crate::config::consts::USER_REJECTED_CODE;
use crate::session::AtmContract;

/// Asks the user whether a wallet may share its accounts with the client.
#[async_trait]
pub trait ConsentPrompt: Send + Sync {
    async fn approve(&self, wallet: &str, accounts: &[Address]) -> bool;

    /// True when consent is granted up front, so accounts count as
    /// authorized even before anyone asks.
    fn implicit(&self) -> bool {
        false
    }
}

/// Grants every request without asking.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait]
impl ConsentPrompt for AutoApprove {
    async fn approve(&self, _wallet: &str, _accounts: &[Address]) -> bool {
        true
    }

    fn implicit(&self) -> bool {
        true
    }
}

pub struct RpcWalletProvider {
    name: String,
    provider: DynProvider,
    signer: Option<Address>,
    consent: Arc<dyn ConsentPrompt>,
    granted: Mutex<Vec<Address>>,
    tx_lock: Arc<Mutex<()>>,
    confirmations: u64,
}

impl RpcWalletProvider {
    /// Use the accounts the node at `url` manages.
    pub fn node_accounts(url: Url, consent: Arc<dyn ConsentPrompt>, confirmations: u64) -> Self {
        let name = format!("node wallet at {url}");
        let provider = ProviderBuilder::new().connect_http(url).erased();
        Self::build(name, provider, None, consent, confirmations)
    }

    /// Sign locally with `signer` and broadcast through `url`.
    pub fn local_key(
        url: Url,
        signer: PrivateKeySigner,
        consent: Arc<dyn ConsentPrompt>,
        confirmations: u64,
    ) -> Self {
        let address = signer.address();
        let name = format!("local key wallet at {url}");
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();
        Self::build(name, provider, Some(address), consent, confirmations)
    }

    fn build(
        name: String,
        provider: DynProvider,
        signer: Option<Address>,
        consent: Arc<dyn ConsentPrompt>,
        confirmations: u64,
    ) -> Self {
        Self {
            name,
            provider,
            signer,
            consent,
            granted: Mutex::new(Vec::new()),
            tx_lock: Arc::new(Mutex::new(())),
            confirmations,
        }
    }

    /// Every account this wallet could expose, granted or not.
    async fn available_accounts(&self) -> Result<Vec<Address>, WalletError> {
        match self.signer {
            Some(address) => Ok(vec![address]),
            None => self.provider.get_accounts().await.map_err(classify),
        }
    }
}

#[async_trait]
impl WalletProvider for RpcWalletProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        let granted = self.granted.lock().await.clone();
        if !granted.is_empty() || !self.consent.implicit() {
            return Ok(granted);
        }
        self.available_accounts().await
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        let mut granted = self.granted.lock().await;
        if !granted.is_empty() {
            return Ok(granted.clone());
        }

        let available = self.available_accounts().await?;
        if available.is_empty() {
            return Err(WalletError::Rpc(anyhow!("{} has no accounts", self.name)));
        }

        if !self.consent.approve(&self.name, &available).await {
            debug!(wallet = %self.name, "Consent denied");
            return Err(WalletError::UserRejected);
        }

        info!(wallet = %self.name, accounts = available.len(), "Account access granted");
        *granted = available.clone();
        Ok(available)
    }

    fn contract(&self, contract_address: Address, account: Address) -> Arc<dyn AtmContract> {
        Arc::new(AssessmentClient::new(
            self.provider.clone(),
            contract_address,
            account,
            self.tx_lock.clone(),
            self.confirmations,
        ))
    }
}

/// Map a transport error to the wallet taxonomy; EIP-1193 code 4001 means the
/// user said no.
fn classify(error: TransportError) -> WalletError {
    if error
        .as_error_resp()
        .is_some_and(|resp| resp.code == USER_REJECTED_CODE)
    {
        return WalletError::UserRejected;
    }
    WalletError::Rpc(anyhow::Error::new(error).context("wallet RPC request failed"))
}

/// Treats a configured JSON-RPC endpoint as the injected wallet.
pub struct RpcDiscovery {
    endpoint: Option<Url>,
    signer: Option<PrivateKeySigner>,
    consent: Arc<dyn ConsentPrompt>,
    confirmations: u64,
}

impl RpcDiscovery {
    pub fn new(
        endpoint: Option<Url>,
        signer: Option<PrivateKeySigner>,
        consent: Arc<dyn ConsentPrompt>,
        confirmations: u64,
    ) -> Self {
        Self {
            endpoint,
            signer,
            consent,
            confirmations,
        }
    }

    /// Parse `rpc_url` and an optional hex private key.
    pub fn from_parts(
        rpc_url: Option<&str>,
        private_key: Option<&str>,
        consent: Arc<dyn ConsentPrompt>,
        confirmations: u64,
    ) -> anyhow::Result<Self> {
        let endpoint = rpc_url
            .map(|url| url.parse::<Url>().with_context(|| format!("Invalid RPC URL: {url}")))
            .transpose()?;
        let signer = private_key
            .map(|key| {
                key.trim_start_matches("0x")
                    .parse::<PrivateKeySigner>()
                    .context("Failed to parse private key")
            })
            .transpose()?;
        Ok(Self::new(endpoint, signer, consent, confirmations))
    }
}

impl ProviderDiscovery for RpcDiscovery {
    fn discover(&self) -> Option<Arc<dyn WalletProvider>> {
        let url = self.endpoint.clone()?;
        let provider = match &self.signer {
            Some(signer) => RpcWalletProvider::local_key(
                url,
                signer.clone(),
                self.consent.clone(),
                self.confirmations,
            ),
            None => RpcWalletProvider::node_accounts(url, self.consent.clone(), self.confirmations),
        };
        Some(Arc::new(provider))
    }
}
