//! 外部协作方能力接口
//!
//! 钱包连接、网络切换、交易提交、确认等待与链上查询均由协作方实现，
//! 核心只通过这些 trait 访问。

use std::sync::Arc;

use async_trait::async_trait;
use ethers::types::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{Balance, TokenMetadata},
    error::ProviderError,
};

/// 确认等待结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confirmation {
    Confirmed,
    /// 已上链但执行失败（revert）
    Failed,
}

#[async_trait]
pub trait WalletConnection: Send + Sync {
    /// 请求连接，返回账户地址
    async fn connect(&self) -> Result<Address, ProviderError>;

    async fn disconnect(&self) -> Result<(), ProviderError>;

    /// 当前已连接账户
    async fn account(&self) -> Option<Address>;

    /// 钱包当前所在网络
    async fn active_chain_id(&self) -> Result<u64, ProviderError>;
}

#[async_trait]
pub trait NetworkSwitch: Send + Sync {
    async fn switch_network(&self, chain_id: u64) -> Result<(), ProviderError>;
}

#[async_trait]
pub trait NativeTransferSubmit: Send + Sync {
    /// 原生币转账，金额为最小单位
    async fn send(&self, to: Address, value: U256) -> Result<TxHash, ProviderError>;
}

#[async_trait]
pub trait ContractTransferSubmit: Send + Sync {
    /// 调用合约 `transfer(to, amount)`
    async fn call_transfer(
        &self,
        contract: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxHash, ProviderError>;
}

#[async_trait]
pub trait ConfirmationWatch: Send + Sync {
    async fn await_confirmation(&self, tx_hash: TxHash) -> Result<Confirmation, ProviderError>;
}

#[async_trait]
pub trait LedgerQuery: Send + Sync {
    async fn native_balance_of(&self, account: Address) -> Result<Balance, ProviderError>;

    async fn token_balance_of(
        &self,
        contract: Address,
        account: Address,
    ) -> Result<U256, ProviderError>;

    async fn token_metadata(&self, contract: Address) -> Result<TokenMetadata, ProviderError>;
}

/// 会话使用的全部能力
#[derive(Clone)]
pub struct Capabilities {
    pub wallet: Arc<dyn WalletConnection>,
    pub network: Arc<dyn NetworkSwitch>,
    pub native: Arc<dyn NativeTransferSubmit>,
    pub contract: Arc<dyn ContractTransferSubmit>,
    pub confirmations: Arc<dyn ConfirmationWatch>,
    pub ledger: Arc<dyn LedgerQuery>,
}

impl Capabilities {
    /// 单个协作方同时提供全部能力（如注入式钱包）
    pub fn from_provider<P>(provider: Arc<P>) -> Self
    where
        P: WalletConnection
            + NetworkSwitch
            + NativeTransferSubmit
            + ContractTransferSubmit
            + ConfirmationWatch
            + LedgerQuery
            + 'static,
    {
        Self {
            wallet: provider.clone(),
            network: provider.clone(),
            native: provider.clone(),
            contract: provider.clone(),
            confirmations: provider.clone(),
            ledger: provider,
        }
    }
}
