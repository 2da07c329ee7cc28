//! 转账状态机
//!
//! Idle → Validating → Submitting → Confirming → Succeeded | Failed
//!
//! 同一会话同一时刻最多一笔转账在途：`in_flight` 在进入 Validating 时以
//! CAS 占位，终态写入后释放。状态通过 `watch` 通道对外发布，只保留最新值。
//!
//! 成功时先发布 Succeeded，再刷新余额，刷新完成后才释放占位；这段时间内
//! 即使状态已显示成功，新的转账仍会得到 `TransferInFlight`。

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::Utc;
use ethers::types::TxHash;
use tokio::sync::watch;

use crate::{
    domain::{
        transfer_status::{MSG_CONFIRMED, MSG_PREPARING, MSG_SUBMITTED},
        Asset, Balance, ChainRegistry, PreparedTransfer, TransferKind, TransferPhase,
        TransferReceipt, TransferRequest, TransferStatus,
    },
    error::{AppError, AppResult, ClassifiedError, ErrorCategory, ProviderError},
    service::{
        balance_cache::{BalanceCache, BalanceKey},
        capabilities::{Capabilities, Confirmation},
        error_classifier::classify,
        validator,
    },
};

const MSG_INTERRUPTED: &str = "Transfer was interrupted before completion";

pub struct TransferStatusMachine {
    caps: Capabilities,
    balances: Arc<BalanceCache>,
    registry: Arc<ChainRegistry>,
    in_flight: AtomicBool,
    /// 用户编辑计数，用于作废过期的校验结果
    edits: AtomicU64,
    phase: watch::Sender<TransferPhase>,
    status: watch::Sender<TransferStatus>,
    confirmation_timeout: Option<Duration>,
}

/// 在途占位；析构时释放。未正常收尾（future 被丢弃）时落到 Failed。
struct FlightGuard<'a> {
    machine: &'a TransferStatusMachine,
    completed: bool,
}

impl<'a> FlightGuard<'a> {
    fn acquire(machine: &'a TransferStatusMachine) -> Option<Self> {
        machine
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self {
                machine,
                completed: false,
            })
    }

    fn complete(&mut self) {
        self.completed = true;
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            tracing::warn!("Transfer dropped before reaching a terminal state");
            self.machine.phase.send_replace(TransferPhase::Failed);
            self.machine.status.send_replace(TransferStatus::Error {
                category: ErrorCategory::Unknown,
                message: MSG_INTERRUPTED.to_string(),
            });
        }
        self.machine.in_flight.store(false, Ordering::SeqCst);
    }
}

impl TransferStatusMachine {
    pub fn new(
        caps: Capabilities,
        balances: Arc<BalanceCache>,
        registry: Arc<ChainRegistry>,
        confirmation_timeout: Option<Duration>,
    ) -> Self {
        let (phase, _) = watch::channel(TransferPhase::Idle);
        let (status, _) = watch::channel(TransferStatus::Idle);
        Self {
            caps,
            balances,
            registry,
            in_flight: AtomicBool::new(false),
            edits: AtomicU64::new(0),
            phase,
            status,
            confirmation_timeout,
        }
    }

    pub fn status(&self) -> TransferStatus {
        self.status.borrow().clone()
    }

    pub fn phase(&self) -> TransferPhase {
        *self.phase.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<TransferStatus> {
        self.status.subscribe()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<TransferPhase> {
        self.phase.subscribe()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn edit_epoch(&self) -> u64 {
        self.edits.load(Ordering::SeqCst)
    }

    /// 用户编辑了表单：作废在途校验；终态回到 Idle
    pub fn note_edit(&self) {
        self.edits.fetch_add(1, Ordering::SeqCst);
        if let Some(mut guard) = FlightGuard::acquire(self) {
            self.acknowledge_terminal();
            guard.complete();
        }
    }

    /// 会话级操作（连接、切换网络）的状态写入；有转账在途时不写，返回 false
    pub fn report(&self, status: TransferStatus) -> bool {
        match FlightGuard::acquire(self) {
            Some(mut guard) => {
                self.acknowledge_terminal();
                self.status.send_replace(status);
                guard.complete();
                true
            }
            None => {
                tracing::debug!(?status, "Status report suppressed while transfer in flight");
                false
            }
        }
    }

    fn acknowledge_terminal(&self) {
        if self.phase().is_final() {
            self.advance(TransferPhase::Idle);
            self.status.send_replace(TransferStatus::Idle);
        }
    }

    fn advance(&self, next: TransferPhase) {
        let current = self.phase();
        if !current.can_transition_to(&next) {
            tracing::warn!(from = %current, to = %next, "Unexpected transfer phase transition");
        }
        self.phase.send_replace(next);
    }

    /// 发起一笔转账并驱动至终态
    pub async fn begin_transfer(&self, request: TransferRequest) -> AppResult<TransferReceipt> {
        let mut guard = match FlightGuard::acquire(self) {
            Some(guard) => guard,
            None => {
                tracing::warn!(
                    chain_id = request.chain_id,
                    phase = %self.phase(),
                    "Transfer rejected: another transfer is in flight"
                );
                return Err(AppError::TransferInFlight);
            }
        };
        let epoch = self.edit_epoch();

        self.advance(TransferPhase::Validating);
        self.status.send_replace(TransferStatus::Validating);

        let prepared = match self.validate(&request).await {
            Ok(prepared) => prepared,
            Err(err) => return Err(self.fail(&mut guard, err)),
        };

        if self.edit_epoch() != epoch {
            tracing::debug!("Validation result discarded after edit");
            self.advance(TransferPhase::Idle);
            self.status.send_replace(TransferStatus::Idle);
            guard.complete();
            return Err(AppError::Superseded);
        }

        self.advance(TransferPhase::Submitting);
        self.status.send_replace(TransferStatus::info(MSG_PREPARING));

        let tx_hash = match self.submit(&request, &prepared).await {
            Ok(tx_hash) => tx_hash,
            Err(err) => return Err(self.fail(&mut guard, err)),
        };

        tracing::info!(
            tx_hash = %format!("{:#x}", tx_hash),
            chain_id = request.chain_id,
            kind = ?prepared.kind,
            amount = %prepared.amount,
            "Transfer submitted"
        );
        self.advance(TransferPhase::Confirming);
        self.status.send_replace(TransferStatus::info(MSG_SUBMITTED));

        if let Err(err) = self.confirm(tx_hash).await {
            return Err(self.fail(&mut guard, err));
        }

        tracing::info!(tx_hash = %format!("{:#x}", tx_hash), "Transfer confirmed");
        self.advance(TransferPhase::Succeeded);
        self.status.send_replace(TransferStatus::success(MSG_CONFIRMED));

        // 释放占位前刷新余额，避免下一笔按旧余额校验
        self.refresh_after_success(&request).await;
        guard.complete();

        Ok(TransferReceipt {
            tx_hash,
            kind: prepared.kind,
            chain_id: request.chain_id,
            to: prepared.to,
            amount: prepared.amount,
            confirmed_at: Utc::now(),
        })
    }

    async fn validate(&self, request: &TransferRequest) -> Result<PreparedTransfer, ClassifiedError> {
        validator::check_inputs(request)?;

        if !self.registry.contains(request.chain_id) {
            return Err(ClassifiedError::validation(format!(
                "Unsupported network: {}",
                request.chain_id
            )));
        }

        let balance = self.balance_for(request).await?;
        Ok(validator::check_request(request, &balance)?)
    }

    /// 取缓存余额；缺失时查询一次
    async fn balance_for(&self, request: &TransferRequest) -> Result<Balance, ClassifiedError> {
        let key = BalanceKey {
            account: request.account,
            chain_id: request.chain_id,
            asset: request.asset(),
        };
        if let Some(balance) = self.balances.get(&key).await {
            return Ok(balance);
        }

        // 链上查询走钱包当前网络，不一致时不能把结果记到请求网络下
        ensure_wallet_chain(&self.caps, request.chain_id).await?;

        let ledger = self.caps.ledger.as_ref();
        let fetched = match (&key.asset, &request.token) {
            (Asset::Token(_), Some(token)) => {
                self.balances
                    .refresh_token(ledger, request.account, request.chain_id, token)
                    .await
            }
            _ => match self.registry.get_by_chain_id(request.chain_id) {
                Some(network) => {
                    self.balances
                        .refresh_native(ledger, request.account, network)
                        .await
                }
                None => {
                    return Err(ClassifiedError::validation(format!(
                        "Unsupported network: {}",
                        request.chain_id
                    )))
                }
            },
        };
        fetched.map_err(|e| {
            tracing::warn!(error = %e, "Balance lookup failed during validation");
            classify(&e)
        })
    }

    async fn submit(
        &self,
        request: &TransferRequest,
        prepared: &PreparedTransfer,
    ) -> Result<TxHash, ClassifiedError> {
        ensure_wallet_chain(&self.caps, request.chain_id).await?;

        let submitted = match (prepared.kind, prepared.contract) {
            (TransferKind::Erc20, Some(contract)) => {
                self.caps
                    .contract
                    .call_transfer(contract, prepared.to, prepared.amount)
                    .await
            }
            _ => self.caps.native.send(prepared.to, prepared.amount).await,
        };

        submitted.map_err(|e| {
            tracing::warn!(error = %e, "Transfer submission rejected");
            classify(&e)
        })
    }

    async fn confirm(&self, tx_hash: TxHash) -> Result<(), ClassifiedError> {
        let pending = self.caps.confirmations.await_confirmation(tx_hash);
        let outcome = match self.confirmation_timeout {
            Some(limit) => match tokio::time::timeout(limit, pending).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    return Err(ClassifiedError::new(
                        ErrorCategory::Timeout,
                        format!(
                            "Transaction was not confirmed within {} seconds",
                            limit.as_secs()
                        ),
                    ))
                }
            },
            None => pending.await,
        };

        match outcome.map_err(|e| classify(&e))? {
            Confirmation::Confirmed => Ok(()),
            Confirmation::Failed => {
                tracing::warn!(tx_hash = %format!("{:#x}", tx_hash), "Transaction reverted");
                Err(classify(&ProviderError::with_code("CONTRACT_ERROR")))
            }
        }
    }

    async fn refresh_after_success(&self, request: &TransferRequest) {
        let ledger = self.caps.ledger.as_ref();
        let Some(network) = self.registry.get_by_chain_id(request.chain_id) else {
            return;
        };
        if let Err(e) = ensure_wallet_chain(&self.caps, request.chain_id).await {
            tracing::warn!(error = %e.message, "Skipping balance refresh after transfer");
            return;
        }

        let native = self.balances.refresh_native(ledger, request.account, network);
        let token = async {
            match &request.token {
                Some(token) if request.kind == TransferKind::Erc20 => Some(
                    self.balances
                        .refresh_token(ledger, request.account, request.chain_id, token)
                        .await,
                ),
                _ => None,
            }
        };

        let (native, token) = futures::join!(native, token);
        if let Err(e) = native {
            tracing::warn!(error = %e, "Native balance refresh after transfer failed");
        }
        if let Some(Err(e)) = token {
            tracing::warn!(error = %e, "Token balance refresh after transfer failed");
        }
    }

    fn fail(&self, guard: &mut FlightGuard<'_>, err: ClassifiedError) -> AppError {
        tracing::warn!(
            category = %err.category,
            message = %err.message,
            "Transfer failed"
        );
        self.advance(TransferPhase::Failed);
        self.status.send_replace(TransferStatus::error(&err));
        guard.complete();
        AppError::Classified(err)
    }
}

/// 钱包当前网络必须与目标网络一致
pub(crate) async fn ensure_wallet_chain(
    caps: &Capabilities,
    chain_id: u64,
) -> Result<(), ClassifiedError> {
    let active = caps
        .wallet
        .active_chain_id()
        .await
        .map_err(|e| classify(&e))?;
    if active != chain_id {
        tracing::warn!(
            wallet_chain = active,
            target_chain = chain_id,
            "Wallet is on a different network"
        );
        return Err(classify(&ProviderError::with_code("CHAIN_MISMATCH")));
    }
    Ok(())
}
