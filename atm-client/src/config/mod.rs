pub mod consts;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use atm_contract_clients::{ANVIL_ATM_CONTRACT_ADDRESS, ANVIL_RPC_URL, ContractConfig};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::config::consts::DEFAULT_CONFIRMATIONS;
use crate::faq::FaqStore;
use crate::transaction::OverlapPolicy;

/// CLI arguments for the ATM client
#[derive(Parser, Debug)]
#[command(name = "atm")]
#[command(about = "Metacrafters ATM - deposit and withdraw through a wallet-connected contract")]
#[command(long_about = None)]
pub struct CliArgs {
    /// JSON-RPC endpoint acting as the wallet provider. Pass an empty value to
    /// start without a wallet.
    #[arg(long, env = "RPC_URL", default_value = ANVIL_RPC_URL)]
    pub rpc_url: String,

    /// Assessment contract address
    #[arg(long, env = "ATM_CONTRACT_ADDRESS")]
    pub contract_address: Option<String>,

    /// Sign locally with this key instead of using the node's accounts
    #[arg(long, env = "PRIVATE_KEY")]
    pub private_key: Option<String>,

    /// Confirmations a transaction needs before the balance is refreshed
    #[arg(long, env = "CONFIRMATIONS", default_value_t = DEFAULT_CONFIRMATIONS)]
    pub confirmations: u64,

    /// Give up waiting for a confirmation after this many seconds
    #[arg(long, env = "CONFIRMATION_TIMEOUT_SECS")]
    pub confirmation_timeout_secs: Option<u64>,

    /// Refuse a transaction while another one is unconfirmed instead of queueing it
    #[arg(long, env = "REJECT_OVERLAPPING_TX")]
    pub reject_overlapping: bool,

    /// Grant account access without asking
    #[arg(long, env = "AUTO_APPROVE")]
    pub auto_approve: bool,

    /// JSON file replacing the built-in FAQ list
    #[arg(long, env = "FAQ_FILE")]
    pub faq_file: Option<PathBuf>,
}

/// Client configuration with all values resolved
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub contract: ContractConfig,
    pub private_key: Option<String>,
    pub confirmation_timeout: Option<Duration>,
    pub overlap_policy: OverlapPolicy,
    pub auto_approve: bool,
    pub faqs: FaqStore,
}

impl ClientConfig {
    /// Load configuration with priority: CLI/env -> defaults
    pub fn load(cli_args: CliArgs) -> Result<Self> {
        let contract_address = match cli_args.contract_address.as_deref() {
            Some(address) => address
                .parse::<Address>()
                .with_context(|| format!("Invalid contract address: {address}"))?,
            None => ANVIL_ATM_CONTRACT_ADDRESS,
        };

        let contract = ContractConfig::new(cli_args.rpc_url.trim().to_string(), contract_address)
            .with_confirmations(cli_args.confirmations);

        let faqs = match &cli_args.faq_file {
            Some(path) => FaqStore::from_json_file(path)?,
            None => FaqStore::default(),
        };

        let overlap_policy = if cli_args.reject_overlapping {
            OverlapPolicy::Reject
        } else {
            OverlapPolicy::Queue
        };

        let config = Self {
            contract,
            private_key: cli_args.private_key,
            confirmation_timeout: cli_args.confirmation_timeout_secs.map(Duration::from_secs),
            overlap_policy,
            auto_approve: cli_args.auto_approve,
            faqs,
        };

        info!(
            "Loaded ClientConfig: rpc_url={}, contract_address={}, confirmations={}, overlap={:?}, faqs={}",
            config.wallet_endpoint().unwrap_or("<none>"),
            config.contract.atm_contract_address,
            config.contract.confirmations,
            config.overlap_policy,
            config.faqs.len()
        );

        Ok(config)
    }

    /// Endpoint of the wallet provider, if one is configured.
    pub fn wallet_endpoint(&self) -> Option<&str> {
        Some(self.contract.rpc_url.as_str()).filter(|url| !url.is_empty())
    }
}
