//! Wallet discovery and account authorization.
//!
//! A [`WalletProvider`] is the Rust side of the injected-provider protocol:
//! non-prompting `eth_accounts`, prompting `eth_requestAccounts`, and a
//! signing context for contract calls. [`WalletConnector`] finds at most one
//! provider and keeps it for the rest of the process.

use alloy::primitives::Address;
use async_trait::async_trait;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use crate::error::AtmError;
use crate::session::AtmContract;

pub mod rpc;

pub use rpc::{AutoApprove, ConsentPrompt, RpcDiscovery, RpcWalletProvider};

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("user rejected the request")]
    UserRejected,

    #[error(transparent)]
    Rpc(#[from] anyhow::Error),
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Human readable wallet name used in logs and prompts.
    fn name(&self) -> &str;

    /// Accounts the user already granted to this client. Never prompts.
    async fn accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// Ask the user to grant account access. Suspends until they answer.
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// Signing context for `contract_address` scoped to `account`.
    fn contract(&self, contract_address: Address, account: Address) -> Arc<dyn AtmContract>;
}

/// Looks for a wallet provider in the execution environment.
///
/// Implementations must not prompt or perform I/O that changes any state.
pub trait ProviderDiscovery: Send + Sync {
    fn discover(&self) -> Option<Arc<dyn WalletProvider>>;
}

pub struct WalletConnector {
    discovery: Box<dyn ProviderDiscovery>,
    provider: OnceLock<Arc<dyn WalletProvider>>,
}

impl WalletConnector {
    pub fn new(discovery: impl ProviderDiscovery + 'static) -> Self {
        Self {
            discovery: Box::new(discovery),
            provider: OnceLock::new(),
        }
    }

    /// Return the cached provider, or look for one. Absent results are not
    /// cached so a provider that shows up later is still found.
    pub fn detect_provider(&self) -> Option<Arc<dyn WalletProvider>> {
        if let Some(provider) = self.provider.get() {
            return Some(provider.clone());
        }

        let discovered = self.discovery.discover()?;
        let provider = self.provider.get_or_init(|| discovered);
        info!(wallet = %provider.name(), "Wallet provider detected");
        Some(provider.clone())
    }

    /// First already-authorized account, if any. Errors are logged and
    /// reported as no account.
    pub async fn get_authorized_account(&self, provider: &dyn WalletProvider) -> Option<Address> {
        match provider.accounts().await {
            Ok(accounts) => match accounts.first() {
                Some(account) => {
                    info!(account = %account, "Account connected");
                    Some(*account)
                }
                None => {
                    debug!("No account found");
                    None
                }
            },
            Err(e) => {
                debug!(error = %e, "Could not read authorized accounts");
                None
            }
        }
    }

    /// Prompt the user for an account through `provider`.
    pub async fn request_account(
        &self,
        provider: &dyn WalletProvider,
    ) -> Result<Address, AtmError> {
        info!(wallet = %provider.name(), "Requesting account access");
        match provider.request_accounts().await {
            Ok(accounts) => match accounts.first() {
                Some(account) => {
                    info!(account = %account, "Account connected");
                    Ok(*account)
                }
                None => {
                    warn!("Wallet granted access to no accounts");
                    Err(AtmError::UserRejected)
                }
            },
            Err(WalletError::UserRejected) => {
                warn!(wallet = %provider.name(), "Account request rejected by user");
                Err(AtmError::UserRejected)
            }
            Err(WalletError::Rpc(e)) => Err(AtmError::remote("account request", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockDiscovery, MockWallet, account};

    #[test]
    fn test_detect_without_provider_is_repeatable() {
        let discovery = MockDiscovery::empty();
        let detections = discovery.detections();
        let connector = WalletConnector::new(discovery);

        assert!(connector.detect_provider().is_none());
        assert!(connector.detect_provider().is_none());
        assert_eq!(detections.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn test_provider_cached_once_found() {
        let discovery = MockDiscovery::empty();
        let slot = discovery.slot();
        let detections = discovery.detections();
        let connector = WalletConnector::new(discovery);

        assert!(connector.detect_provider().is_none());

        *slot.lock().unwrap() = Some(Arc::new(MockWallet::approving()));
        let first = connector.detect_provider().unwrap();
        let second = connector.detect_provider().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        // The third call is served from the cache
        assert_eq!(detections.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_authorized_account_is_silent() {
        let connector = WalletConnector::new(MockDiscovery::empty());

        let wallet = MockWallet::approving();
        assert_eq!(connector.get_authorized_account(&wallet).await, None);
        assert_eq!(wallet.request_calls(), 0);

        let wallet = MockWallet::approving().pre_authorized();
        assert_eq!(connector.get_authorized_account(&wallet).await, Some(account()));
        assert_eq!(wallet.request_calls(), 0);
    }

    #[tokio::test]
    async fn test_authorized_account_swallows_errors() {
        let connector = WalletConnector::new(MockDiscovery::empty());
        let wallet = MockWallet::approving().broken();
        assert_eq!(connector.get_authorized_account(&wallet).await, None);
    }

    #[tokio::test]
    async fn test_request_account() {
        let connector = WalletConnector::new(MockDiscovery::empty());

        let wallet = MockWallet::approving();
        assert_eq!(connector.request_account(&wallet).await.unwrap(), account());
        assert_eq!(wallet.request_calls(), 1);

        let wallet = MockWallet::rejecting();
        let err = connector.request_account(&wallet).await.unwrap_err();
        assert!(matches!(err, AtmError::UserRejected));

        let wallet = MockWallet::approving().broken();
        let err = connector.request_account(&wallet).await.unwrap_err();
        assert!(matches!(err, AtmError::RemoteFailure { .. }));
    }
}
