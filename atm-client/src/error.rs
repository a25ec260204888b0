use alloy::primitives::U256;

use crate::transaction::TxKind;

/// Why an action was refused before anything was sent to the wallet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("'{input}' is not a valid amount. Please enter a whole number.")]
    NotANumber { input: String },

    #[error("Minimum {kind} amount is {minimum} ETH.")]
    BelowMinimum { kind: TxKind, minimum: U256 },

    #[error("Please enter a valid question number to remove the FAQ ('{input}' is not in 1..={len}).")]
    InvalidIndex { input: String, len: usize },

    #[error("Another transaction is still waiting for confirmation.")]
    TransactionInFlight,
}

/// Everything a user-triggered action can fail with.
#[derive(Debug, thiserror::Error)]
pub enum AtmError {
    #[error("A wallet is required to use this ATM. Please install one.")]
    ProviderMissing,

    #[error("The account request was rejected in the wallet.")]
    UserRejected,

    #[error("No contract session is open. Connect a wallet first.")]
    SessionUnavailable,

    #[error(transparent)]
    ValidationRejected(#[from] Rejection),

    #[error("{action} failed: {error:#}")]
    RemoteFailure {
        action: &'static str,
        error: anyhow::Error,
    },
}

impl AtmError {
    pub fn remote(action: &'static str, error: impl Into<anyhow::Error>) -> Self {
        Self::RemoteFailure {
            action,
            error: error.into(),
        }
    }

    /// The rejection behind a `ValidationRejected`, if any.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::ValidationRejected(rejection) => Some(rejection),
            _ => None,
        }
    }
}
