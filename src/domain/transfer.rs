//! 转账请求与草稿

use chrono::{DateTime, Utc};
use ethers::types::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};

use super::token::{Asset, TokenDescriptor};

/// 转账类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferKind {
    #[default]
    Native,
    Erc20,
}

/// 单次提交的转账请求（提交后不可变）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub kind: TransferKind,
    /// 发起账户
    pub account: Address,
    /// 目标网络
    pub chain_id: u64,
    /// 收款地址（原始输入）
    pub recipient: String,
    /// 十进制金额（原始输入）
    pub amount: String,
    /// ERC20 转账必须携带已解析精度的代币描述
    pub token: Option<TokenDescriptor>,
}

impl TransferRequest {
    pub fn native(
        account: Address,
        chain_id: u64,
        recipient: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            kind: TransferKind::Native,
            account,
            chain_id,
            recipient: recipient.into(),
            amount: amount.into(),
            token: None,
        }
    }

    pub fn erc20(
        account: Address,
        chain_id: u64,
        token: TokenDescriptor,
        recipient: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            kind: TransferKind::Erc20,
            account,
            chain_id,
            recipient: recipient.into(),
            amount: amount.into(),
            token: Some(token),
        }
    }

    /// 余额校验对应的资产
    pub fn asset(&self) -> Asset {
        match (&self.kind, &self.token) {
            (TransferKind::Erc20, Some(token)) => Asset::Token(token.contract_address),
            _ => Asset::Native,
        }
    }
}

/// 通过校验、可直接提交的转账
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTransfer {
    pub kind: TransferKind,
    pub to: Address,
    /// 最小单位金额
    pub amount: U256,
    /// ERC20 合约地址
    pub contract: Option<Address>,
}

/// 已确认转账的回执
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub tx_hash: TxHash,
    pub kind: TransferKind,
    pub chain_id: u64,
    pub to: Address,
    pub amount: U256,
    pub confirmed_at: DateTime<Utc>,
}

/// 表单草稿：用户正在编辑的字段
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDraft {
    pub kind: TransferKind,
    pub recipient: String,
    pub amount: String,
    pub token_address: String,
}

impl TransferDraft {
    /// 转账成功后清空：收款地址、金额；ERC20 额外清空代币地址
    pub fn clear_after_success(&mut self) {
        self.recipient.clear();
        self.amount.clear();
        if self.kind == TransferKind::Erc20 {
            self.token_address.clear();
        }
    }
}
