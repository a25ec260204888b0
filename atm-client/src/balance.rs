use alloy::primitives::U256;
use tracing::{debug, info};

use crate::error::AtmError;
use crate::session::ContractSession;

/// Read the connected account's balance from the contract.
pub async fn fetch(session: &ContractSession) -> Result<U256, AtmError> {
    let balance = session
        .contract()
        .balance()
        .await
        .map_err(|e| AtmError::remote("balance refresh", e))?;
    info!(account = %session.account(), %balance, "💰 Balance refreshed");
    Ok(balance)
}

/// Refresh the balance when a session is open. Without one this is a no-op
/// that hands back `previous`.
pub async fn refresh(
    session: Option<&ContractSession>,
    previous: Option<U256>,
) -> Result<Option<U256>, AtmError> {
    match session {
        Some(session) => fetch(session).await.map(Some),
        None => {
            debug!("No contract session, skipping balance refresh");
            Ok(previous)
        }
    }
}
