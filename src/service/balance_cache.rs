//! 余额缓存
//!
//! 按 (账户, 网络, 资产) 保存最近一次查询结果。刷新时整体替换条目，
//! 查询失败不改动已有条目。

use std::collections::HashMap;

use ethers::types::Address;
use tokio::sync::RwLock;

use crate::{
    domain::{Asset, Balance, Network, TokenDescriptor},
    error::ProviderError,
    service::capabilities::LedgerQuery,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BalanceKey {
    pub account: Address,
    pub chain_id: u64,
    pub asset: Asset,
}

impl BalanceKey {
    pub fn native(account: Address, chain_id: u64) -> Self {
        Self {
            account,
            chain_id,
            asset: Asset::Native,
        }
    }

    pub fn token(account: Address, chain_id: u64, contract: Address) -> Self {
        Self {
            account,
            chain_id,
            asset: Asset::Token(contract),
        }
    }
}

#[derive(Default)]
pub struct BalanceCache {
    entries: RwLock<HashMap<BalanceKey, Balance>>,
}

impl BalanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &BalanceKey) -> Option<Balance> {
        self.entries.read().await.get(key).copied()
    }

    /// 重新查询原生币余额并替换条目；精度以网络定义为准
    pub async fn refresh_native(
        &self,
        ledger: &dyn LedgerQuery,
        account: Address,
        network: &Network,
    ) -> Result<Balance, ProviderError> {
        let fetched = ledger.native_balance_of(account).await?;
        let balance = Balance::new(fetched.raw, network.native_decimals);
        self.store(BalanceKey::native(account, network.id), balance).await;
        Ok(balance)
    }

    /// 重新查询代币余额并替换条目
    pub async fn refresh_token(
        &self,
        ledger: &dyn LedgerQuery,
        account: Address,
        chain_id: u64,
        token: &TokenDescriptor,
    ) -> Result<Balance, ProviderError> {
        let raw = ledger
            .token_balance_of(token.contract_address, account)
            .await?;
        let balance = Balance::new(raw, token.decimals);
        self.store(
            BalanceKey::token(account, chain_id, token.contract_address),
            balance,
        )
        .await;
        Ok(balance)
    }

    async fn store(&self, key: BalanceKey, balance: Balance) {
        tracing::debug!(
            account = %format!("{:#x}", key.account),
            chain_id = key.chain_id,
            asset = ?key.asset,
            raw = %balance.raw,
            "Balance cache updated"
        );
        self.entries.write().await.insert(key, balance);
    }

    /// 指定账户在指定网络下的全部余额
    pub async fn entries_for(&self, account: Address, chain_id: u64) -> Vec<(Asset, Balance)> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|(k, _)| k.account == account && k.chain_id == chain_id)
            .map(|(k, v)| (k.asset, *v))
            .collect()
    }

    /// 整体失效（账户切换）
    pub async fn invalidate_all(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
