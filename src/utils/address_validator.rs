//! 地址与金额输入校验
//!
//! 纯函数，无副作用；既用于输入框实时反馈，也作为提交前的闸门。

use std::str::FromStr;

use ethers::types::Address;
use once_cell::sync::Lazy;
use regex::Regex;

static EVM_ADDRESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap());

/// 纯十进制：`123`、`0.5`、`.5`、`10.`；无符号、指数与分隔符
static DECIMAL_AMOUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)$").unwrap());

/// 地址是否为 `0x` + 40 位十六进制（大小写不敏感，不做 EIP-55 校验）
pub fn validate_address(address: &str) -> bool {
    EVM_ADDRESS_RE.is_match(address)
}

/// 金额是否为正的纯十进制数
///
/// 与 `to_smallest_unit` 接受同一语法，不限位数；精度与范围在提交前按代币精度再查。
pub fn validate_amount(amount: &str) -> bool {
    let amount = amount.trim();
    DECIMAL_AMOUNT_RE.is_match(amount) && amount.bytes().any(|b| matches!(b, b'1'..=b'9'))
}

/// 地址校验器
pub struct AddressValidator;

impl AddressValidator {
    /// 校验并解析为 `Address`
    pub fn parse(address: &str) -> Option<Address> {
        if !validate_address(address) {
            return None;
        }
        Address::from_str(address).ok()
    }

    /// EIP-55 校验和格式（用于显示）
    pub fn to_checksum(address: &Address) -> String {
        ethers::utils::to_checksum(address, None)
    }
}
