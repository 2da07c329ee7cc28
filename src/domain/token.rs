//! 代币与余额模型

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// ERC20 代币描述（按合约地址懒加载）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDescriptor {
    pub contract_address: Address,
    pub decimals: u8,
    pub symbol: String,
}

/// 代币元数据（LedgerQuery::token_metadata 返回）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub decimals: u8,
    pub symbol: String,
}

impl TokenDescriptor {
    pub fn from_metadata(contract_address: Address, metadata: TokenMetadata) -> Self {
        Self {
            contract_address,
            decimals: metadata.decimals,
            symbol: metadata.symbol,
        }
    }
}

/// 余额资产：原生币或某个代币合约
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "contract", rename_all = "lowercase")]
pub enum Asset {
    Native,
    Token(Address),
}

/// 余额（最小单位 + 精度）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub raw: U256,
    pub decimals: u8,
}

impl Balance {
    pub fn new(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    /// 显示单位字符串（如 "1.500000000000000000"）
    pub fn formatted(&self) -> String {
        ethers::utils::format_units(self.raw, u32::from(self.decimals))
            .unwrap_or_else(|_| self.raw.to_string())
    }
}

/// 十进制金额转最小单位失败原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    #[error("amount is not a plain decimal number")]
    Malformed,
    #[error("amount has more than {0} decimal places")]
    TooPrecise(u8),
    #[error("amount does not fit in 256 bits")]
    Overflow,
}

/// 将十进制字符串按精度换算为最小单位整数
///
/// 只接受 `123`、`0.5`、`.5`、`10.` 形式；不接受符号、指数与分隔符。
pub fn to_smallest_unit(amount: &str, decimals: u8) -> Result<U256, UnitsError> {
    let amount = amount.trim();
    let (int_part, frac_part) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(UnitsError::Malformed);
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(UnitsError::Malformed);
    }

    // 末尾多余的 0 不影响精度
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.len() > usize::from(decimals) {
        return Err(UnitsError::TooPrecise(decimals));
    }

    let mut digits = String::with_capacity(int_part.len() + usize::from(decimals));
    digits.push_str(int_part);
    digits.push_str(frac_part);
    for _ in frac_part.len()..usize::from(decimals) {
        digits.push('0');
    }

    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_dec_str(digits).map_err(|_| UnitsError::Overflow)
}
