//! Decoding of contract and RPC failures into messages a user can act on.

use alloy::sol_types::{Panic, Revert, SolError, SolInterface};
use std::fmt::Debug;

/// Decode a failed contract call, preferring the contract's own custom errors,
/// then `Error(string)`/`Panic(uint256)` payloads, then the raw error text.
pub fn decode_contract_error<S: SolInterface + Debug>(error: alloy::contract::Error) -> String {
    match error.try_decode_into_interface_error::<S>() {
        Ok(decoded) => format!("{decoded:?}"),
        Err(error) => match error.as_revert_data() {
            Some(data) => decode_revert_data::<S>(&data).unwrap_or_else(|| error.to_string()),
            None => describe_rpc_failure(&error.to_string()),
        },
    }
}

/// Decode raw revert bytes returned by the node. Only the contract's own
/// errors and the standard `Error(string)`/`Panic(uint256)` payloads count;
/// empty or unknown data yields `None`.
pub fn decode_revert_data<S: SolInterface + Debug>(data: &[u8]) -> Option<String> {
    if let Ok(decoded) = S::abi_decode(data) {
        return Some(format!("{decoded:?}"));
    }
    if let Ok(revert) = Revert::abi_decode(data) {
        return Some(revert.reason);
    }
    if let Ok(panic) = Panic::abi_decode(data) {
        return Some(format!("panic code {}", panic.code));
    }
    None
}

/// Map well known provider error strings to friendlier messages.
pub fn describe_rpc_failure(message: &str) -> String {
    let lower = message.to_lowercase();
    if lower.contains("insufficient funds") {
        "Insufficient ETH for gas. Please fund the account.".to_string()
    } else if lower.contains("nonce too low") {
        "Nonce too low. A transaction may have been confirmed already.".to_string()
    } else if lower.contains("replacement transaction underpriced") {
        "Transaction underpriced. A pending transaction may be blocking.".to_string()
    } else if lower.contains("user denied") || lower.contains("user rejected") {
        "The wallet user rejected the request.".to_string()
    } else {
        message.to_string()
    }
}
