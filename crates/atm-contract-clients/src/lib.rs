use alloy::primitives::{Address, address};

pub mod assessment;
pub mod common;

// ============================================================================
// Client Type Re-exports
// ============================================================================

pub use assessment::{Assessment, AssessmentClient};
pub use common::tx_submitter::TransactionSubmitter;

// ============================================================================
// Contract Configuration
// ============================================================================

/// Address the `Assessment` contract gets on a fresh anvil node when deployed
/// first by account #0.
pub const ANVIL_ATM_CONTRACT_ADDRESS: Address =
    address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");

/// Default anvil JSON-RPC endpoint.
pub const ANVIL_RPC_URL: &str = "http://127.0.0.1:8545";

/// Configuration for connecting to the ATM smart contract
#[derive(Clone, Debug)]
pub struct ContractConfig {
    pub atm_contract_address: Address,
    pub rpc_url: String,
    /// Blocks a transaction must be buried under before it counts as confirmed
    pub confirmations: u64,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            atm_contract_address: Address::ZERO,
            rpc_url: String::new(),
            confirmations: 1,
        }
    }
}

impl ContractConfig {
    /// Create a new configuration for a deployed contract
    ///
    /// # Arguments
    /// * `rpc_url` - Ethereum RPC endpoint exposed by the wallet
    /// * `atm_contract_address` - Address of the deployed Assessment contract
    pub fn new(rpc_url: String, atm_contract_address: Address) -> Self {
        Self {
            atm_contract_address,
            rpc_url,
            ..Default::default()
        }
    }

    /// Create a configuration with anvil local testnet defaults
    pub fn anvil_config() -> Self {
        Self::new(ANVIL_RPC_URL.to_string(), ANVIL_ATM_CONTRACT_ADDRESS)
    }

    pub fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations.max(1);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let atm_address = "0x89c1312Cedb0B0F67e4913D2076bd4a860652B69"
            .parse::<Address>()
            .unwrap();

        let config = ContractConfig::new("http://localhost:8545".to_string(), atm_address);

        assert_eq!(config.atm_contract_address, atm_address);
        assert_eq!(config.rpc_url, "http://localhost:8545");
        assert_eq!(config.confirmations, 1);
    }

    #[test]
    fn test_anvil_config() {
        let config = ContractConfig::anvil_config();
        assert_eq!(
            config.atm_contract_address,
            "0x5FbDB2315678afecb367f032d93F642f64180aa3"
                .parse::<Address>()
                .unwrap()
        );
        assert_eq!(config.rpc_url, ANVIL_RPC_URL);
    }

    #[test]
    fn test_confirmations_never_zero() {
        let config = ContractConfig::anvil_config().with_confirmations(0);
        assert_eq!(config.confirmations, 1);

        let config = ContractConfig::anvil_config().with_confirmations(3);
        assert_eq!(config.confirmations, 3);
    }
}
