//! 钱包会话
//!
//! 一个用户一个会话：已连接账户、所选网络、表单草稿与已解析代币都挂在会话上，
//! 同一进程可并存多个会话。转账状态与余额刷新状态分两个通道发布。

use std::{sync::Arc, time::Duration};

use ethers::types::Address;
use tokio::sync::{watch, RwLock};

use crate::{
    domain::{
        transfer_status::{MSG_CONNECTED, MSG_CONNECTING, MSG_REFRESHED, MSG_REFRESHING, MSG_SWITCHING},
        Asset, Balance, ChainRegistry, Network, TokenDescriptor, TransferDraft, TransferKind,
        TransferPhase, TransferReceipt, TransferRequest, TransferStatus,
    },
    error::{AppError, AppResult, ClassifiedError, ErrorCategory},
    service::{
        balance_cache::BalanceCache, capabilities::Capabilities, error_classifier::classify,
        transfer_machine::{ensure_wallet_chain, TransferStatusMachine},
        validator::ValidationError,
    },
    utils::AddressValidator,
};

#[derive(Debug, Default)]
struct SessionState {
    account: Option<Address>,
    chain_id: u64,
    draft: TransferDraft,
    /// 与 `draft.token_address` 对应的已解析代币
    token: Option<TokenDescriptor>,
}

pub struct WalletSession {
    caps: Capabilities,
    registry: Arc<ChainRegistry>,
    balances: Arc<BalanceCache>,
    machine: TransferStatusMachine,
    refresh_status: watch::Sender<TransferStatus>,
    state: RwLock<SessionState>,
}

impl WalletSession {
    pub fn new(
        caps: Capabilities,
        registry: Arc<ChainRegistry>,
        default_chain_id: u64,
        confirmation_timeout: Option<Duration>,
    ) -> AppResult<Self> {
        if !registry.contains(default_chain_id) {
            return Err(AppError::UnsupportedNetwork(default_chain_id));
        }

        let balances = Arc::new(BalanceCache::new());
        let machine = TransferStatusMachine::new(
            caps.clone(),
            balances.clone(),
            registry.clone(),
            confirmation_timeout,
        );
        let (refresh_status, _) = watch::channel(TransferStatus::Idle);

        Ok(Self {
            caps,
            registry,
            balances,
            machine,
            refresh_status,
            state: RwLock::new(SessionState {
                chain_id: default_chain_id,
                ..Default::default()
            }),
        })
    }

    // ===== 查询 =====

    pub async fn account(&self) -> Option<Address> {
        self.state.read().await.account
    }

    pub async fn selected_network(&self) -> AppResult<Network> {
        let chain_id = self.state.read().await.chain_id;
        self.network(chain_id)
    }

    pub async fn draft(&self) -> TransferDraft {
        self.state.read().await.draft.clone()
    }

    pub async fn token(&self) -> Option<TokenDescriptor> {
        self.state.read().await.token.clone()
    }

    /// 当前账户在所选网络下的已缓存余额
    pub async fn balances(&self) -> Vec<(Asset, Balance)> {
        let (account, chain_id) = {
            let state = self.state.read().await;
            (state.account, state.chain_id)
        };
        match account {
            Some(account) => self.balances.entries_for(account, chain_id).await,
            None => Vec::new(),
        }
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn status(&self) -> TransferStatus {
        self.machine.status()
    }

    pub fn phase(&self) -> TransferPhase {
        self.machine.phase()
    }

    pub fn refresh_status(&self) -> TransferStatus {
        self.refresh_status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<TransferStatus> {
        self.machine.subscribe_status()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<TransferPhase> {
        self.machine.subscribe_phase()
    }

    pub fn subscribe_refresh(&self) -> watch::Receiver<TransferStatus> {
        self.refresh_status.subscribe()
    }

    fn network(&self, chain_id: u64) -> AppResult<Network> {
        self.registry
            .get_by_chain_id(chain_id)
            .cloned()
            .ok_or(AppError::UnsupportedNetwork(chain_id))
    }

    // ===== 连接 =====

    pub async fn connect(&self) -> AppResult<Address> {
        self.machine.report(TransferStatus::info(MSG_CONNECTING));

        let account = match self.caps.wallet.connect().await {
            Ok(account) => account,
            Err(e) => {
                tracing::warn!(error = %e, "Wallet connection failed");
                return Err(self.report_failure(classify(&e)));
            }
        };

        // 以钱包当前网络为准（若受支持）
        let wallet_chain = match self.caps.wallet.active_chain_id().await {
            Ok(chain_id) if self.registry.contains(chain_id) => Some(chain_id),
            Ok(chain_id) => {
                tracing::info!(chain_id, "Wallet is on an unsupported network, keeping selection");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read wallet network");
                None
            }
        };

        self.apply_account(Some(account)).await;
        if let Some(chain_id) = wallet_chain {
            self.state.write().await.chain_id = chain_id;
        }

        tracing::info!(
            account = %AddressValidator::to_checksum(&account),
            chain_id = ?wallet_chain,
            "Wallet connected"
        );
        self.machine.report(TransferStatus::success(MSG_CONNECTED));

        if let Err(e) = self.refresh_balances().await {
            tracing::warn!(error = %e, "Initial balance fetch failed");
        }
        Ok(account)
    }

    pub async fn disconnect(&self) -> AppResult<()> {
        if self.machine.is_in_flight() {
            return Err(AppError::TransferInFlight);
        }
        if let Err(e) = self.caps.wallet.disconnect().await {
            return Err(self.report_failure(classify(&e)));
        }

        self.apply_account(None).await;
        self.machine.report(TransferStatus::Idle);
        self.refresh_status.send_replace(TransferStatus::Idle);
        tracing::info!("Wallet disconnected");
        Ok(())
    }

    /// 钱包侧账户变更事件
    pub async fn on_account_changed(&self, account: Option<Address>) {
        let changed = self.apply_account(account).await;
        if changed && account.is_some() {
            if let Err(e) = self.refresh_balances().await {
                tracing::warn!(error = %e, "Balance fetch after account change failed");
            }
        }
    }

    /// 钱包侧网络变更事件
    pub async fn on_chain_changed(&self, chain_id: u64) {
        if !self.registry.contains(chain_id) {
            tracing::warn!(chain_id, "Wallet switched to an unsupported network");
            self.machine.report(TransferStatus::error(&ClassifiedError::new(
                ErrorCategory::ChainMismatch,
                "Please switch to the correct network in your wallet",
            )));
            return;
        }

        let changed = {
            let mut state = self.state.write().await;
            let changed = state.chain_id != chain_id;
            state.chain_id = chain_id;
            changed
        };
        if changed && self.account().await.is_some() {
            if let Err(e) = self.refresh_balances().await {
                tracing::warn!(error = %e, "Balance fetch after network change failed");
            }
        }
    }

    /// 账户变化时整体失效余额缓存；返回是否变化
    async fn apply_account(&self, account: Option<Address>) -> bool {
        let mut state = self.state.write().await;
        if state.account == account {
            return false;
        }
        state.account = account;
        drop(state);

        self.balances.invalidate_all().await;
        true
    }

    // ===== 网络 =====

    pub async fn switch_network(&self, chain_id: u64) -> AppResult<Network> {
        let network = self.network(chain_id)?;

        if self.machine.is_in_flight() {
            tracing::warn!(chain_id, "Network switch rejected while transfer in flight");
            return Err(AppError::TransferInFlight);
        }

        self.machine.report(TransferStatus::info(MSG_SWITCHING));
        if let Err(e) = self.caps.network.switch_network(chain_id).await {
            tracing::warn!(chain_id, error = %e, "Network switch failed");
            return Err(self.report_failure(classify(&e)));
        }

        self.state.write().await.chain_id = chain_id;
        tracing::info!(chain_id, network = %network.name, "Network switched");
        self.machine.report(TransferStatus::success(format!(
            "Switched to {} network",
            network.name
        )));

        if self.account().await.is_some() {
            if let Err(e) = self.refresh_balances().await {
                tracing::warn!(error = %e, "Balance fetch after network switch failed");
            }
        }
        Ok(network)
    }

    // ===== 草稿编辑 =====

    pub async fn set_kind(&self, kind: TransferKind) {
        self.state.write().await.draft.kind = kind;
        self.machine.note_edit();
    }

    pub async fn set_recipient(&self, recipient: impl Into<String>) {
        self.state.write().await.draft.recipient = recipient.into();
        self.machine.note_edit();
    }

    pub async fn set_amount(&self, amount: impl Into<String>) {
        self.state.write().await.draft.amount = amount.into();
        self.machine.note_edit();
    }

    /// 更换代币地址会丢弃已解析的代币描述
    pub async fn set_token_address(&self, address: impl Into<String>) {
        let address = address.into();
        {
            let mut state = self.state.write().await;
            if state.draft.token_address != address {
                state.token = None;
            }
            state.draft.token_address = address;
        }
        self.machine.note_edit();
    }

    /// 解析草稿中的代币地址；同一地址只查询一次
    pub async fn resolve_token(&self) -> AppResult<Option<TokenDescriptor>> {
        let (address, cached) = {
            let state = self.state.read().await;
            (state.draft.token_address.trim().to_string(), state.token.clone())
        };
        if address.is_empty() {
            return Ok(None);
        }
        let Some(contract) = AddressValidator::parse(&address) else {
            return Err(self.report_failure(ValidationError::InvalidTokenAddress.into()));
        };

        if let Some(token) = cached.filter(|t| t.contract_address == contract) {
            return Ok(Some(token));
        }

        let metadata = match self.caps.ledger.token_metadata(contract).await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(
                    contract = %format!("{:#x}", contract),
                    error = %e,
                    "Token metadata lookup failed"
                );
                return Err(self.report_failure(classify(&e)));
            }
        };
        let token = TokenDescriptor::from_metadata(contract, metadata);
        tracing::debug!(
            contract = %format!("{:#x}", contract),
            symbol = %token.symbol,
            decimals = token.decimals,
            "Token resolved"
        );

        let mut state = self.state.write().await;
        // 查询期间地址被改过则不落缓存
        if state.draft.token_address.trim() == address {
            state.token = Some(token.clone());
        }
        Ok(Some(token))
    }

    // ===== 转账 =====

    /// 以当前草稿发起转账；成功且期间无编辑时清空草稿
    pub async fn submit(&self) -> AppResult<TransferReceipt> {
        let (account, chain_id, draft) = {
            let state = self.state.read().await;
            (state.account, state.chain_id, state.draft.clone())
        };
        let account = account.ok_or(AppError::NotConnected)?;

        let token = match draft.kind {
            TransferKind::Erc20 => self.resolve_token().await?,
            TransferKind::Native => None,
        };
        let request = TransferRequest {
            kind: draft.kind,
            account,
            chain_id,
            recipient: draft.recipient.trim().to_string(),
            amount: draft.amount.trim().to_string(),
            token,
        };

        let epoch = self.machine.edit_epoch();
        let receipt = self.machine.begin_transfer(request).await?;

        // 确认期间用户已开始编辑下一笔，保留其输入
        if self.machine.edit_epoch() != epoch {
            tracing::debug!("Draft edited during transfer, keeping it");
            return Ok(receipt);
        }
        let mut state = self.state.write().await;
        state.draft.clear_after_success();
        if state.draft.kind == TransferKind::Erc20 {
            state.token = None;
        }
        Ok(receipt)
    }

    // ===== 余额 =====

    /// 刷新原生币与（已解析的）代币余额；结果只写刷新通道
    pub async fn refresh_balances(&self) -> AppResult<Vec<(Asset, Balance)>> {
        let (account, chain_id, resolved) = {
            let state = self.state.read().await;
            (state.account, state.chain_id, state.token.clone())
        };
        let account = account.ok_or(AppError::NotConnected)?;
        let network = self.network(chain_id)?;

        self.refresh_status.send_replace(TransferStatus::info(MSG_REFRESHING));

        if let Err(classified) = ensure_wallet_chain(&self.caps, chain_id).await {
            self.refresh_status
                .send_replace(TransferStatus::error(&classified));
            return Err(AppError::Classified(classified));
        }

        let ledger = self.caps.ledger.as_ref();
        let native = self.balances.refresh_native(ledger, account, &network);
        let token = async {
            match &resolved {
                Some(token) => Some(
                    self.balances
                        .refresh_token(ledger, account, chain_id, token)
                        .await,
                ),
                None => None,
            }
        };
        let (native, token) = futures::join!(native, token);

        let failure = native.err().or_else(|| token.and_then(Result::err));
        if let Some(e) = failure {
            tracing::warn!(chain_id, error = %e, "Balance refresh failed");
            let classified = classify(&e);
            self.refresh_status
                .send_replace(TransferStatus::error(&classified));
            return Err(AppError::Classified(classified));
        }

        self.refresh_status
            .send_replace(TransferStatus::success(MSG_REFRESHED));
        Ok(self.balances.entries_for(account, chain_id).await)
    }

    fn report_failure(&self, err: ClassifiedError) -> AppError {
        self.machine.report(TransferStatus::error(&err));
        AppError::Classified(err)
    }
}
