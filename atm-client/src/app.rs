//! The ATM application core.
//!
//! [`AtmApp`] owns the published [`AppSnapshot`] and runs every user action:
//! it calls into the wallet connector, contract session, balance sync and
//! transaction submitter, and turns each outcome into an [`Event`]. The UI
//! only reads snapshots and calls these methods.

use alloy::primitives::{Address, B256, U256};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::balance;
use crate::config::ClientConfig;
use crate::error::AtmError;
use crate::faq::FaqStore;
use crate::session::ContractSession;
use crate::state::{AppSnapshot, Event};
use crate::transaction::{Transaction, TransactionSubmitter, TxKind};
use crate::wallet::{ConsentPrompt, RpcDiscovery, WalletConnector, WalletProvider};

/// How a deposit or withdrawal ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    /// No contract session was open, nothing happened.
    Skipped,
    Confirmed {
        tx_hash: B256,
        balance: Option<U256>,
    },
}

pub struct AtmApp {
    connector: WalletConnector,
    contract_address: Address,
    submitter: TransactionSubmitter,
    state: watch::Sender<AppSnapshot>,
}

impl AtmApp {
    pub fn new(
        connector: WalletConnector,
        contract_address: Address,
        submitter: TransactionSubmitter,
        faqs: FaqStore,
    ) -> Self {
        Self {
            connector,
            contract_address,
            submitter,
            state: watch::Sender::new(AppSnapshot::with_faqs(faqs)),
        }
    }

    /// Build the app against the wallet endpoint named in `config`.
    pub fn from_config(
        config: &ClientConfig,
        consent: Arc<dyn ConsentPrompt>,
    ) -> anyhow::Result<Self> {
        let discovery = RpcDiscovery::from_parts(
            config.wallet_endpoint(),
            config.private_key.as_deref(),
            consent,
            config.contract.confirmations,
        )?;
        Ok(Self::new(
            WalletConnector::new(discovery),
            config.contract.atm_contract_address,
            TransactionSubmitter::new(config.overlap_policy, config.confirmation_timeout),
            config.faqs.clone(),
        ))
    }

    pub fn snapshot(&self) -> AppSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver notified after every applied event.
    pub fn subscribe(&self) -> watch::Receiver<AppSnapshot> {
        self.state.subscribe()
    }

    /// Apply `event` to the current snapshot and publish the result.
    pub fn dispatch(&self, event: Event) -> Result<(), AtmError> {
        let name = event.name();
        let mut outcome = Ok(());
        self.state.send_if_modified(|snapshot| match snapshot.apply(event) {
            Ok(next) => {
                *snapshot = next;
                true
            }
            Err(e) => {
                outcome = Err(e);
                false
            }
        });

        match &outcome {
            Ok(()) => debug!(event = name, "Event applied"),
            Err(e) => debug!(event = name, error = %e, "Event refused"),
        }
        outcome
    }

    /// Page-load check. Looks for a provider and an already-authorized
    /// account without prompting; any failure just means no account.
    pub async fn startup(&self) -> Option<Address> {
        let Some(provider) = self.detect() else {
            info!("No wallet provider found");
            return None;
        };

        let account = self
            .connector
            .get_authorized_account(provider.as_ref())
            .await?;

        if let Err(e) = self.open_session(provider.as_ref(), account) {
            warn!(error = %e, "Could not open contract session");
            return None;
        }
        if let Err(e) = self.refresh_balance().await {
            warn!(error = %e, "Initial balance refresh failed");
        }
        Some(account)
    }

    /// Connect action. Prompts the wallet for an account unless one is
    /// already connected, then opens the session and reads the balance.
    pub async fn connect(&self) -> Result<Address, AtmError> {
        let provider = self.detect().ok_or(AtmError::ProviderMissing)?;

        let snapshot = self.snapshot();
        if let (Some(account), Some(_)) = (snapshot.account(), snapshot.session()) {
            debug!(account = %account, "Already connected");
            return Ok(account);
        }

        let account = self.connector.request_account(provider.as_ref()).await?;
        self.open_session(provider.as_ref(), account)?;
        self.refresh_balance().await?;
        Ok(account)
    }

    /// Re-read the balance of the connected account. Without a session the
    /// last known balance is returned unchanged.
    pub async fn refresh_balance(&self) -> Result<Option<U256>, AtmError> {
        let snapshot = self.snapshot();
        let refreshed = balance::refresh(snapshot.session(), snapshot.balance()).await?;

        if let (Some(session), Some(balance)) = (snapshot.session(), refreshed) {
            self.dispatch(Event::BalanceUpdated {
                account: session.account(),
                balance,
            })?;
        }
        Ok(refreshed)
    }

    pub async fn deposit(&self, input: &str) -> Result<TxOutcome, AtmError> {
        self.transact(TxKind::Deposit, input).await
    }

    pub async fn withdraw(&self, input: &str) -> Result<TxOutcome, AtmError> {
        self.transact(TxKind::Withdraw, input).await
    }

    /// Pick a question and return its answer, `""` when nothing matches.
    pub fn select_question(&self, question: &str) -> String {
        // FaqSelected never fails
        let _ = self.dispatch(Event::FaqSelected(question.to_string()));
        self.state
            .borrow()
            .selection()
            .map(|selection| selection.answer.clone())
            .unwrap_or_default()
    }

    /// Remove the FAQ at a 1-based position typed by the user.
    pub fn remove_faq(&self, input: &str) -> Result<(), AtmError> {
        let position = self.state.borrow().faqs().parse_position(input)?;
        self.dispatch(Event::FaqRemoved(position))?;
        info!(position, "FAQ removed");
        Ok(())
    }

    fn detect(&self) -> Option<Arc<dyn WalletProvider>> {
        let provider = self.connector.detect_provider()?;
        self.dispatch(Event::ProviderDetected(provider.clone())).ok()?;
        Some(provider)
    }

    fn open_session(
        &self,
        provider: &dyn WalletProvider,
        account: Address,
    ) -> Result<(), AtmError> {
        let session = ContractSession::open(provider, Some(account), self.contract_address)?;
        self.dispatch(Event::AccountConnected(session))
    }

    async fn transact(&self, kind: TxKind, input: &str) -> Result<TxOutcome, AtmError> {
        let Some(session) = self.snapshot().session().cloned() else {
            debug!(%kind, "No contract session, ignoring");
            return Ok(TxOutcome::Skipped);
        };

        let mut tx = Transaction::new(kind, input);
        let amount = match tx.validate() {
            Ok(amount) => amount,
            Err(rejection) => {
                warn!(%kind, input, reason = %rejection, "Transaction rejected");
                self.dispatch(Event::TransactionRejected(tx))?;
                return Err(rejection.into());
            }
        };

        // Held through confirmation and the balance refresh that follows
        let _slot = match self.submitter.reserve().await {
            Ok(slot) => slot,
            Err(rejection) => {
                warn!(%kind, %amount, reason = %rejection, "Transaction rejected");
                tx.reject(rejection.clone());
                self.dispatch(Event::TransactionRejected(tx))?;
                return Err(rejection.into());
            }
        };

        let tx_hash = match self.submitter.submit(&session, &mut tx, amount).await {
            Ok(tx_hash) => {
                self.dispatch(Event::TransactionSubmitted(tx.clone()))?;
                tx_hash
            }
            Err(e) => {
                self.dispatch(Event::TransactionFailed(tx))?;
                return Err(e);
            }
        };

        if let Err(e) = self.submitter.confirm(&session, &mut tx, tx_hash).await {
            self.dispatch(Event::TransactionFailed(tx))?;
            return Err(e);
        }
        self.dispatch(Event::TransactionConfirmed(tx))?;

        let balance = self.refresh_balance().await?;
        Ok(TxOutcome::Confirmed { tx_hash, balance })
    }
}
