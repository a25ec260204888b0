//! Deposit and withdraw intents.
//!
//! Each intent walks a small state machine:
//!
//! ```text
//! Idle -> Validated -> Submitted -> Confirmed
//!   |         |            |
//!   v         v            v
//! Rejected  Rejected     Failed
//!           Failed
//! ```
//!
//! `Validated -> Rejected` happens when the overlap policy refuses a second
//! transaction; `Validated -> Failed` when the wallet refuses to broadcast.

use alloy::primitives::{B256, U256};
use anyhow::anyhow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::config::consts::{MIN_DEPOSIT, MIN_WITHDRAW};
use crate::error::{AtmError, Rejection};
use crate::session::ContractSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxKind {
    Deposit,
    Withdraw,
}

impl TxKind {
    /// Smallest amount the client lets through for this kind.
    pub fn minimum(self) -> U256 {
        match self {
            TxKind::Deposit => MIN_DEPOSIT,
            TxKind::Withdraw => MIN_WITHDRAW,
        }
    }

    /// Contract method backing this kind.
    pub fn method(self) -> &'static str {
        match self {
            TxKind::Deposit => "deposit",
            TxKind::Withdraw => "withdraw",
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxKind::Deposit => f.write_str("deposit"),
            TxKind::Withdraw => f.write_str("withdrawal"),
        }
    }
}

/// Parse user input into an amount and check it against the kind's minimum.
///
/// Only base-10 whole numbers are accepted. Negative numbers are numbers, so
/// they fail the threshold rather than the format check.
pub fn parse_amount(kind: TxKind, input: &str) -> Result<U256, Rejection> {
    let trimmed = input.trim();
    let not_a_number = || Rejection::NotANumber {
        input: input.to_string(),
    };
    let below_minimum = || Rejection::BelowMinimum {
        kind,
        minimum: kind.minimum(),
    };

    let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    if let Some(magnitude) = trimmed.strip_prefix('-') {
        return Err(if is_digits(magnitude) {
            below_minimum()
        } else {
            not_a_number()
        });
    }

    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if !is_digits(digits) {
        return Err(not_a_number());
    }

    let amount = U256::from_str_radix(digits, 10).map_err(|_| not_a_number())?;
    if amount < kind.minimum() {
        return Err(below_minimum());
    }
    Ok(amount)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxState {
    Idle,
    Validated,
    Submitted(B256),
    Confirmed(B256),
    Rejected(Rejection),
    Failed(String),
}

impl TxState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TxState::Confirmed(_) | TxState::Rejected(_) | TxState::Failed(_)
        )
    }

    pub fn can_advance_to(&self, next: &TxState) -> bool {
        use TxState::*;
        matches!(
            (self, next),
            (Idle, Validated)
                | (Idle, Rejected(_))
                | (Validated, Submitted(_))
                | (Validated, Rejected(_))
                | (Validated, Failed(_))
                | (Submitted(_), Confirmed(_))
                | (Submitted(_), Failed(_))
        )
    }
}

/// One deposit or withdraw intent and where it currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    kind: TxKind,
    input: String,
    amount: Option<U256>,
    tx_hash: Option<B256>,
    state: TxState,
}

impl Transaction {
    pub fn new(kind: TxKind, input: impl Into<String>) -> Self {
        Self {
            kind,
            input: input.into(),
            amount: None,
            tx_hash: None,
            state: TxState::Idle,
        }
    }

    pub fn kind(&self) -> TxKind {
        self.kind
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn amount(&self) -> Option<U256> {
        self.amount
    }

    /// Hash assigned at submission. Kept after the transaction fails.
    pub fn tx_hash(&self) -> Option<B256> {
        self.tx_hash
    }

    pub fn state(&self) -> &TxState {
        &self.state
    }

    /// `Idle -> Validated` on a usable amount, `Idle -> Rejected` otherwise.
    pub fn validate(&mut self) -> Result<U256, Rejection> {
        match parse_amount(self.kind, &self.input) {
            Ok(amount) => {
                self.amount = Some(amount);
                self.advance(TxState::Validated);
                Ok(amount)
            }
            Err(rejection) => {
                self.advance(TxState::Rejected(rejection.clone()));
                Err(rejection)
            }
        }
    }

    pub(crate) fn reject(&mut self, rejection: Rejection) {
        self.advance(TxState::Rejected(rejection));
    }

    pub(crate) fn mark_submitted(&mut self, tx_hash: B256) {
        self.tx_hash = Some(tx_hash);
        self.advance(TxState::Submitted(tx_hash));
    }

    pub(crate) fn mark_confirmed(&mut self, tx_hash: B256) {
        self.advance(TxState::Confirmed(tx_hash));
    }

    pub(crate) fn mark_failed(&mut self, reason: String) {
        self.advance(TxState::Failed(reason));
    }

    fn advance(&mut self, next: TxState) {
        debug_assert!(
            self.state.can_advance_to(&next),
            "illegal transaction transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(kind = %self.kind, from = ?self.state, to = ?next, "transaction state change");
        self.state = next;
    }
}

/// What to do with a transaction started while another one is unconfirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Wait for the earlier transaction (and its balance refresh) to finish.
    #[default]
    Queue,
    /// Refuse the new transaction with `Rejection::TransactionInFlight`.
    Reject,
}

/// Sends validated intents through a contract session and waits for them.
#[derive(Debug, Clone)]
pub struct TransactionSubmitter {
    slot: Arc<Mutex<()>>,
    policy: OverlapPolicy,
    confirmation_timeout: Option<Duration>,
}

impl Default for TransactionSubmitter {
    fn default() -> Self {
        Self::new(OverlapPolicy::default(), None)
    }
}

impl TransactionSubmitter {
    pub fn new(policy: OverlapPolicy, confirmation_timeout: Option<Duration>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(())),
            policy,
            confirmation_timeout,
        }
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    /// Claim the single transaction slot. Hold the guard until the balance
    /// refresh that follows confirmation is done.
    pub async fn reserve(&self) -> Result<OwnedMutexGuard<()>, Rejection> {
        match self.policy {
            OverlapPolicy::Queue => Ok(self.slot.clone().lock_owned().await),
            OverlapPolicy::Reject => self
                .slot
                .clone()
                .try_lock_owned()
                .map_err(|_| Rejection::TransactionInFlight),
        }
    }

    /// `Validated -> Submitted`, or `Validated -> Failed` when the wallet
    /// refuses to broadcast.
    pub async fn submit(
        &self,
        session: &ContractSession,
        tx: &mut Transaction,
        amount: U256,
    ) -> Result<B256, AtmError> {
        let kind = tx.kind();
        match session.contract().submit(kind, amount).await {
            Ok(tx_hash) => {
                info!(
                    %kind,
                    %amount,
                    tx_hash = ?tx_hash,
                    account = %session.account(),
                    "transaction submitted"
                );
                tx.mark_submitted(tx_hash);
                Ok(tx_hash)
            }
            Err(e) => {
                warn!(%kind, %amount, error = %e, "transaction submission failed");
                tx.mark_failed(format!("{e:#}"));
                Err(AtmError::remote(kind.method(), e))
            }
        }
    }

    /// `Submitted -> Confirmed` once mined, `Submitted -> Failed` on a revert,
    /// provider error or timeout.
    pub async fn confirm(
        &self,
        session: &ContractSession,
        tx: &mut Transaction,
        tx_hash: B256,
    ) -> Result<B256, AtmError> {
        let kind = tx.kind();
        let confirmation = session.contract().confirm(kind, tx_hash);
        let result = match self.confirmation_timeout {
            Some(limit) => tokio::time::timeout(limit, confirmation)
                .await
                .unwrap_or_else(|_| {
                    Err(anyhow!(
                        "timed out after {}s waiting for confirmation of {tx_hash:?}",
                        limit.as_secs()
                    ))
                }),
            None => confirmation.await,
        };

        match result {
            Ok(()) => {
                info!(%kind, tx_hash = ?tx_hash, "✅ transaction confirmed");
                tx.mark_confirmed(tx_hash);
                Ok(tx_hash)
            }
            Err(e) => {
                warn!(%kind, tx_hash = ?tx_hash, error = %e, "transaction failed");
                tx.mark_failed(format!("{e:#}"));
                Err(AtmError::remote(kind.method(), e))
            }
        }
    }
}
