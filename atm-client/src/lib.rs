pub mod app;
pub mod balance;
pub mod config;
pub mod error;
pub mod faq;
pub mod session;
pub mod shell;
pub mod state;
pub mod transaction;
pub mod view;
pub mod wallet;

#[cfg(test)]
mod testing;

pub use app::{AtmApp, TxOutcome};
pub use config::{CliArgs, ClientConfig};
pub use error::{AtmError, Rejection};
pub use faq::{FaqEntry, FaqStore};
pub use session::{AtmContract, ContractSession};
pub use state::{AppSnapshot, Event};
pub use transaction::{OverlapPolicy, Transaction, TransactionSubmitter, TxKind, TxState};
pub use view::View;
pub use wallet::{WalletConnector, WalletProvider};
