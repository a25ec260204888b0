//! In-memory wallet and contract used by the unit tests.

use alloy::primitives::{Address, B256, U256};
use anyhow::{anyhow, bail};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::session::AtmContract;
use crate::transaction::TxKind;
use crate::wallet::{ProviderDiscovery, WalletError, WalletProvider};

pub(crate) fn account() -> Address {
    "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
        .parse()
        .unwrap()
}

/// Contract that keeps its balance in memory and applies transactions when
/// they are confirmed.
pub(crate) struct MockContract {
    balance: Mutex<U256>,
    pending: Mutex<HashMap<B256, (TxKind, U256)>>,
    balance_reads: AtomicUsize,
    submissions: AtomicUsize,
    fail_submission: bool,
    never_confirm: bool,
    confirm_delay: Option<Duration>,
}

impl MockContract {
    pub(crate) fn new(balance: U256) -> Self {
        Self {
            balance: Mutex::new(balance),
            pending: Mutex::new(HashMap::new()),
            balance_reads: AtomicUsize::new(0),
            submissions: AtomicUsize::new(0),
            fail_submission: false,
            never_confirm: false,
            confirm_delay: None,
        }
    }

    pub(crate) fn failing_submission(mut self) -> Self {
        self.fail_submission = true;
        self
    }

    pub(crate) fn never_confirming(mut self) -> Self {
        self.never_confirm = true;
        self
    }

    pub(crate) fn confirming_after(mut self, delay: Duration) -> Self {
        self.confirm_delay = Some(delay);
        self
    }

    pub(crate) fn current_balance(&self) -> U256 {
        *self.balance.lock().unwrap()
    }

    pub(crate) fn balance_reads(&self) -> usize {
        self.balance_reads.load(Ordering::SeqCst)
    }

    pub(crate) fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }
}

/// A `MockContract` seen through a particular address and account.
struct BoundContract {
    address: Address,
    account: Address,
    inner: Arc<MockContract>,
}

#[async_trait]
impl AtmContract for BoundContract {
    fn address(&self) -> Address {
        self.address
    }

    fn account(&self) -> Address {
        self.account
    }

    async fn balance(&self) -> anyhow::Result<U256> {
        self.inner.balance_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.inner.current_balance())
    }

    async fn submit(&self, kind: TxKind, amount: U256) -> anyhow::Result<B256> {
        let n = self.inner.submissions.fetch_add(1, Ordering::SeqCst) + 1;
        if self.inner.fail_submission {
            bail!("{} failed to send: connection refused", kind.method());
        }
        let tx_hash = B256::with_last_byte(n as u8);
        self.inner
            .pending
            .lock()
            .unwrap()
            .insert(tx_hash, (kind, amount));
        Ok(tx_hash)
    }

    async fn confirm(&self, kind: TxKind, tx_hash: B256) -> anyhow::Result<()> {
        if self.inner.never_confirm {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.inner.confirm_delay {
            tokio::time::sleep(delay).await;
        }

        let (pending_kind, amount) = self
            .inner
            .pending
            .lock()
            .unwrap()
            .remove(&tx_hash)
            .ok_or_else(|| anyhow!("unknown transaction {tx_hash:?}"))?;
        assert_eq!(pending_kind, kind);

        let mut balance = self.inner.balance.lock().unwrap();
        match kind {
            TxKind::Deposit => *balance += amount,
            TxKind::Withdraw => {
                if *balance < amount {
                    bail!(
                        "withdraw reverted on-chain: InsufficientBalance {{ balance: {}, withdrawAmount: {amount} }}",
                        *balance
                    );
                }
                *balance -= amount;
            }
        }
        Ok(())
    }
}

/// Wallet with a single account and a scripted answer to account requests.
pub(crate) struct MockWallet {
    approve: bool,
    broken: bool,
    authorized: Mutex<bool>,
    request_calls: AtomicUsize,
    contract: Arc<MockContract>,
}

impl MockWallet {
    pub(crate) fn approving() -> Self {
        Self::with_contract(Arc::new(MockContract::new(U256::ZERO)))
    }

    pub(crate) fn rejecting() -> Self {
        Self {
            approve: false,
            ..Self::approving()
        }
    }

    pub(crate) fn with_contract(contract: Arc<MockContract>) -> Self {
        Self {
            approve: true,
            broken: false,
            authorized: Mutex::new(false),
            request_calls: AtomicUsize::new(0),
            contract,
        }
    }

    pub(crate) fn pre_authorized(self) -> Self {
        *self.authorized.lock().unwrap() = true;
        self
    }

    pub(crate) fn broken(mut self) -> Self {
        self.broken = true;
        self
    }

    pub(crate) fn request_calls(&self) -> usize {
        self.request_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    fn name(&self) -> &str {
        "mock"
    }

    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        if self.broken {
            return Err(WalletError::Rpc(anyhow!("connection refused")));
        }
        Ok(if *self.authorized.lock().unwrap() {
            vec![account()]
        } else {
            Vec::new()
        })
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        self.request_calls.fetch_add(1, Ordering::SeqCst);
        if self.broken {
            return Err(WalletError::Rpc(anyhow!("connection refused")));
        }
        if !self.approve {
            return Err(WalletError::UserRejected);
        }
        *self.authorized.lock().unwrap() = true;
        Ok(vec![account()])
    }

    fn contract(&self, contract_address: Address, account: Address) -> Arc<dyn AtmContract> {
        Arc::new(BoundContract {
            address: contract_address,
            account,
            inner: self.contract.clone(),
        })
    }
}

type ProviderSlot = Arc<Mutex<Option<Arc<dyn WalletProvider>>>>;

/// Discovery whose answer can be changed while a test runs.
pub(crate) struct MockDiscovery {
    slot: ProviderSlot,
    detections: Arc<AtomicUsize>,
}

impl MockDiscovery {
    pub(crate) fn empty() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            detections: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn with(provider: Arc<dyn WalletProvider>) -> Self {
        let discovery = Self::empty();
        *discovery.slot.lock().unwrap() = Some(provider);
        discovery
    }

    pub(crate) fn slot(&self) -> ProviderSlot {
        self.slot.clone()
    }

    pub(crate) fn detections(&self) -> Arc<AtomicUsize> {
        self.detections.clone()
    }
}

impl ProviderDiscovery for MockDiscovery {
    fn discover(&self) -> Option<Arc<dyn WalletProvider>> {
        self.detections.fetch_add(1, Ordering::SeqCst);
        self.slot.lock().unwrap().clone()
    }
}
