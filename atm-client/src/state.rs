//! Application state as one immutable snapshot.
//!
//! Every change is an [`Event`] applied to the current snapshot, producing the
//! next one. The reducer keeps the dependency chain
//! provider → account → session → balance intact: no stage is ever set while
//! the one before it is empty.

use alloy::primitives::{Address, B256, U256};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::AtmError;
use crate::faq::{FaqSelection, FaqStore};
use crate::session::ContractSession;
use crate::transaction::Transaction;
use crate::wallet::WalletProvider;

pub enum Event {
    ProviderDetected(Arc<dyn WalletProvider>),
    /// An account was authorized and a session opened for it.
    AccountConnected(ContractSession),
    BalanceUpdated { account: Address, balance: U256 },
    TransactionRejected(Transaction),
    TransactionSubmitted(Transaction),
    TransactionConfirmed(Transaction),
    TransactionFailed(Transaction),
    FaqSelected(String),
    /// Remove the FAQ at a 1-based position.
    FaqRemoved(usize),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::ProviderDetected(_) => "ProviderDetected",
            Event::AccountConnected(_) => "AccountConnected",
            Event::BalanceUpdated { .. } => "BalanceUpdated",
            Event::TransactionRejected(_) => "TransactionRejected",
            Event::TransactionSubmitted(_) => "TransactionSubmitted",
            Event::TransactionConfirmed(_) => "TransactionConfirmed",
            Event::TransactionFailed(_) => "TransactionFailed",
            Event::FaqSelected(_) => "FaqSelected",
            Event::FaqRemoved(_) => "FaqRemoved",
        }
    }
}

#[derive(Clone, Default)]
pub struct AppSnapshot {
    provider: Option<Arc<dyn WalletProvider>>,
    account: Option<Address>,
    session: Option<ContractSession>,
    balance: Option<U256>,
    faqs: FaqStore,
    selection: Option<FaqSelection>,
    last_transaction: Option<Transaction>,
    in_flight: Vec<B256>,
}

impl AppSnapshot {
    pub fn with_faqs(faqs: FaqStore) -> Self {
        Self {
            faqs,
            ..Default::default()
        }
    }

    pub fn provider(&self) -> Option<&Arc<dyn WalletProvider>> {
        self.provider.as_ref()
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn session(&self) -> Option<&ContractSession> {
        self.session.as_ref()
    }

    pub fn balance(&self) -> Option<U256> {
        self.balance
    }

    pub fn faqs(&self) -> &FaqStore {
        &self.faqs
    }

    pub fn selection(&self) -> Option<&FaqSelection> {
        self.selection.as_ref()
    }

    pub fn last_transaction(&self) -> Option<&Transaction> {
        self.last_transaction.as_ref()
    }

    /// Hashes of submitted transactions that are not yet settled.
    pub fn in_flight(&self) -> &[B256] {
        &self.in_flight
    }

    /// Produce the snapshot that follows `event`.
    ///
    /// Events that no longer apply (a balance for a replaced account, a second
    /// provider) leave the state unchanged. Events that would break the
    /// dependency chain or remove a missing FAQ are errors.
    pub fn apply(&self, event: Event) -> Result<AppSnapshot, AtmError> {
        let mut next = self.clone();
        match event {
            Event::ProviderDetected(provider) => {
                if next.provider.is_none() {
                    next.provider = Some(provider);
                }
            }
            Event::AccountConnected(session) => {
                if next.provider.is_none() {
                    return Err(AtmError::ProviderMissing);
                }
                if next.account != Some(session.account()) {
                    next.balance = None;
                }
                next.account = Some(session.account());
                next.session = Some(session);
            }
            Event::BalanceUpdated { account, balance } => {
                match &next.session {
                    Some(session) if session.account() == account => next.balance = Some(balance),
                    _ => debug!(account = %account, "Dropping balance for a session that is gone"),
                }
            }
            Event::TransactionRejected(tx) => {
                next.last_transaction = Some(tx);
            }
            Event::TransactionSubmitted(tx) => {
                if let Some(hash) = tx.tx_hash() {
                    next.in_flight.push(hash);
                }
                next.last_transaction = Some(tx);
            }
            Event::TransactionConfirmed(tx) | Event::TransactionFailed(tx) => {
                if let Some(hash) = tx.tx_hash() {
                    next.in_flight.retain(|pending| *pending != hash);
                }
                next.last_transaction = Some(tx);
            }
            Event::FaqSelected(question) => {
                next.selection = if question.is_empty() {
                    None
                } else {
                    let answer = next.faqs.select(&question).to_string();
                    Some(FaqSelection { question, answer })
                };
            }
            Event::FaqRemoved(position) => {
                next.faqs.remove_at(position)?;
                let orphaned = next
                    .selection
                    .as_ref()
                    .is_some_and(|selection| !next.faqs.contains(&selection.question));
                if orphaned {
                    next.selection = None;
                }
            }
        }
        Ok(next)
    }
}

impl fmt::Debug for AppSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppSnapshot")
            .field("provider", &self.provider.as_ref().map(|p| p.name()))
            .field("account", &self.account)
            .field("session", &self.session)
            .field("balance", &self.balance)
            .field("faqs", &self.faqs.len())
            .field("selection", &self.selection)
            .field("last_transaction", &self.last_transaction)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}
