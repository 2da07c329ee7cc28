//! 测试辅助模块
//! 提供内存钱包与会话构造函数

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use ethers::types::{Address, TxHash, U256};
use tokio::sync::Notify;
use token_transfer::{
    domain::{Balance, ChainRegistry, TokenMetadata},
    error::ProviderError,
    service::{
        Capabilities, Confirmation, ConfirmationWatch, ContractTransferSubmit, LedgerQuery,
        NativeTransferSubmit, NetworkSwitch, WalletConnection, WalletSession,
    },
};

pub const SEPOLIA: u64 = 11155111;
pub const AMOY: u64 = 80002;
pub const RECIPIENT: &str = "0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb6";
pub const WEI_PER_MILLI: u64 = 1_000_000_000_000_000;

pub fn account() -> Address {
    Address::repeat_byte(0xaa)
}

pub fn token_contract() -> Address {
    Address::repeat_byte(0xcc)
}

pub fn token_contract_str() -> String {
    format!("{:#x}", token_contract())
}

/// 以 0.001 ETH 为单位
pub fn milli_eth(amount: u64) -> U256 {
    U256::from(amount) * U256::from(WEI_PER_MILLI)
}

/// 挂起某个调用直到测试放行
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

impl Gate {
    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

/// 内存钱包：实现全部能力，带调用计数与可编程失败
pub struct MockWallet {
    pub account: Address,
    connected: Mutex<Option<Address>>,
    chain_id: AtomicU64,
    native: Mutex<U256>,
    tokens: Mutex<HashMap<Address, U256>>,
    metadata: Mutex<HashMap<Address, TokenMetadata>>,
    next_tx: AtomicU64,

    pub connect_error: Mutex<Option<ProviderError>>,
    pub switch_error: Mutex<Option<ProviderError>>,
    pub submit_error: Mutex<Option<ProviderError>>,
    pub balance_error: Mutex<Option<ProviderError>>,
    pub confirmation: Mutex<Confirmation>,
    pub confirm_hangs: AtomicBool,

    pub submit_gate: Mutex<Option<Arc<Gate>>>,
    pub confirm_gate: Mutex<Option<Arc<Gate>>>,
    pub balance_gate: Mutex<Option<Arc<Gate>>>,

    pub submit_calls: AtomicUsize,
    pub confirm_calls: AtomicUsize,
    pub switch_calls: AtomicUsize,
    pub native_balance_calls: AtomicUsize,
    pub token_balance_calls: AtomicUsize,
    pub metadata_calls: AtomicUsize,
}

impl MockWallet {
    pub fn new(native_balance: U256) -> Self {
        Self {
            account: account(),
            connected: Mutex::new(None),
            chain_id: AtomicU64::new(SEPOLIA),
            native: Mutex::new(native_balance),
            tokens: Mutex::new(HashMap::new()),
            metadata: Mutex::new(HashMap::new()),
            next_tx: AtomicU64::new(1),
            connect_error: Mutex::new(None),
            switch_error: Mutex::new(None),
            submit_error: Mutex::new(None),
            balance_error: Mutex::new(None),
            confirmation: Mutex::new(Confirmation::Confirmed),
            confirm_hangs: AtomicBool::new(false),
            submit_gate: Mutex::new(None),
            confirm_gate: Mutex::new(None),
            balance_gate: Mutex::new(None),
            submit_calls: AtomicUsize::new(0),
            confirm_calls: AtomicUsize::new(0),
            switch_calls: AtomicUsize::new(0),
            native_balance_calls: AtomicUsize::new(0),
            token_balance_calls: AtomicUsize::new(0),
            metadata_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_token(self, contract: Address, decimals: u8, symbol: &str, balance: U256) -> Self {
        self.metadata.lock().unwrap().insert(
            contract,
            TokenMetadata {
                decimals,
                symbol: symbol.to_string(),
            },
        );
        self.tokens.lock().unwrap().insert(contract, balance);
        self
    }

    /// 模拟用户在钱包里切换网络（会话不知情）
    pub fn set_chain(&self, chain_id: u64) {
        self.chain_id.store(chain_id, Ordering::SeqCst);
    }

    pub fn native_balance(&self) -> U256 {
        *self.native.lock().unwrap()
    }

    pub fn token_balance(&self, contract: Address) -> U256 {
        self.tokens
            .lock()
            .unwrap()
            .get(&contract)
            .copied()
            .unwrap_or_default()
    }

    pub fn gate_submission(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        *self.submit_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn gate_confirmation(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        *self.confirm_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn gate_balance(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        *self.balance_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn fail_submit(&self, err: ProviderError) {
        *self.submit_error.lock().unwrap() = Some(err);
    }

    pub fn fail_switch(&self, err: ProviderError) {
        *self.switch_error.lock().unwrap() = Some(err);
    }

    pub fn fail_balance(&self, err: Option<ProviderError>) {
        *self.balance_error.lock().unwrap() = err;
    }

    fn gate(slot: &Mutex<Option<Arc<Gate>>>) -> Option<Arc<Gate>> {
        slot.lock().unwrap().clone()
    }

    fn next_hash(&self) -> TxHash {
        TxHash::from_low_u64_be(self.next_tx.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl WalletConnection for MockWallet {
    async fn connect(&self) -> Result<Address, ProviderError> {
        if let Some(err) = self.connect_error.lock().unwrap().clone() {
            return Err(err);
        }
        *self.connected.lock().unwrap() = Some(self.account);
        Ok(self.account)
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        *self.connected.lock().unwrap() = None;
        Ok(())
    }

    async fn account(&self) -> Option<Address> {
        *self.connected.lock().unwrap()
    }

    async fn active_chain_id(&self) -> Result<u64, ProviderError> {
        Ok(self.chain_id.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl NetworkSwitch for MockWallet {
    async fn switch_network(&self, chain_id: u64) -> Result<(), ProviderError> {
        self.switch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.switch_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.chain_id.store(chain_id, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl NativeTransferSubmit for MockWallet {
    async fn send(&self, _to: Address, value: U256) -> Result<TxHash, ProviderError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = Self::gate(&self.submit_gate) {
            gate.pass().await;
        }
        if let Some(err) = self.submit_error.lock().unwrap().clone() {
            return Err(err);
        }
        let mut native = self.native.lock().unwrap();
        *native = native.saturating_sub(value);
        Ok(self.next_hash())
    }
}

#[async_trait]
impl ContractTransferSubmit for MockWallet {
    async fn call_transfer(
        &self,
        contract: Address,
        _to: Address,
        amount: U256,
    ) -> Result<TxHash, ProviderError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = Self::gate(&self.submit_gate) {
            gate.pass().await;
        }
        if let Some(err) = self.submit_error.lock().unwrap().clone() {
            return Err(err);
        }
        let mut tokens = self.tokens.lock().unwrap();
        let balance = tokens.entry(contract).or_default();
        *balance = balance.saturating_sub(amount);
        Ok(self.next_hash())
    }
}

#[async_trait]
impl ConfirmationWatch for MockWallet {
    async fn await_confirmation(&self, _tx_hash: TxHash) -> Result<Confirmation, ProviderError> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = Self::gate(&self.confirm_gate) {
            gate.pass().await;
        }
        if self.confirm_hangs.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(*self.confirmation.lock().unwrap())
    }
}

#[async_trait]
impl LedgerQuery for MockWallet {
    async fn native_balance_of(&self, _account: Address) -> Result<Balance, ProviderError> {
        self.native_balance_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = Self::gate(&self.balance_gate) {
            gate.pass().await;
        }
        if let Some(err) = self.balance_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(Balance::new(self.native_balance(), 18))
    }

    async fn token_balance_of(
        &self,
        contract: Address,
        _account: Address,
    ) -> Result<U256, ProviderError> {
        self.token_balance_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.balance_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.token_balance(contract))
    }

    async fn token_metadata(&self, contract: Address) -> Result<TokenMetadata, ProviderError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        self.metadata
            .lock()
            .unwrap()
            .get(&contract)
            .cloned()
            .ok_or_else(|| ProviderError::rpc(-32000, "execution reverted"))
    }
}

pub fn session(wallet: Arc<MockWallet>) -> WalletSession {
    session_with_timeout(wallet, None)
}

pub fn session_with_timeout(wallet: Arc<MockWallet>, timeout: Option<Duration>) -> WalletSession {
    WalletSession::new(
        Capabilities::from_provider(wallet),
        Arc::new(ChainRegistry::new()),
        SEPOLIA,
        timeout,
    )
    .expect("default chain is registered")
}

/// 1.5 ETH 的已连接会话
pub async fn connected(wallet: MockWallet) -> (Arc<MockWallet>, Arc<WalletSession>) {
    let wallet = Arc::new(wallet);
    let session = Arc::new(session(wallet.clone()));
    session.connect().await.expect("connect");
    (wallet, session)
}
