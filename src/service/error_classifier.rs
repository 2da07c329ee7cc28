//! 协作方错误分类
//!
//! 优先级：字符串透传 > 结构化错误码 > 文案子串匹配 > 原文透传 > 未知。
//! 永不失败。

use crate::error::{ClassifiedError, ErrorCategory, ErrorCode, ProviderError};

pub const MSG_UNKNOWN: &str = "An unknown error occurred";

/// 数值错误码（EIP-1193 / JSON-RPC）
const NUMERIC_CODES: &[(i64, ErrorCategory, &str)] = &[
    (4001, ErrorCategory::UserRejected, "Transaction rejected by user"),
    (
        -32603,
        ErrorCategory::InsufficientFunds,
        "Internal JSON-RPC error. Please check your wallet has sufficient funds.",
    ),
    (
        -32002,
        ErrorCategory::ProviderBusy,
        "MetaMask is already processing a request. Please check your MetaMask wallet.",
    ),
    (
        4902,
        ErrorCategory::ChainMismatch,
        "This network has not been added to your wallet",
    ),
];

/// 命名错误码
const NAMED_CODES: &[(&str, ErrorCategory, &str)] = &[
    ("INSUFFICIENT_FUNDS", ErrorCategory::InsufficientFunds, "Insufficient funds for transfer"),
    (
        "UNPREDICTABLE_GAS_LIMIT",
        ErrorCategory::GasError,
        "Unable to estimate gas. The transaction may fail.",
    ),
    ("USER_REJECTED", ErrorCategory::UserRejected, "Transaction was rejected by the user"),
    (
        "NETWORK_ERROR",
        ErrorCategory::NetworkError,
        "Network error. Please check your connection and try again.",
    ),
    (
        "CHAIN_MISMATCH",
        ErrorCategory::ChainMismatch,
        "Please switch to the correct network in your wallet",
    ),
    (
        "CONTRACT_ERROR",
        ErrorCategory::ContractError,
        "Smart contract error. The transaction cannot be completed.",
    ),
];

/// 文案子串（小写匹配）
const MESSAGE_HINTS: &[(&str, ErrorCategory, &str)] = &[
    ("insufficient funds", ErrorCategory::InsufficientFunds, "Insufficient funds for transfer"),
    (
        "gas required exceeds allowance",
        ErrorCategory::GasError,
        "Transaction would exceed gas limit",
    ),
    ("nonce too low", ErrorCategory::NonceConflict, "Transaction nonce error. Please try again."),
    (
        "replacement fee too low",
        ErrorCategory::GasError,
        "Gas price too low. Please increase gas price and try again.",
    ),
    ("metamask", ErrorCategory::ProviderBusy, "Please check MetaMask and try again"),
];

/// 协作方错误 → (分类, 文案)
pub fn classify(err: &ProviderError) -> ClassifiedError {
    let (code, message) = match err {
        ProviderError::Message(text) => {
            return ClassifiedError::new(ErrorCategory::Generic, text.clone());
        }
        ProviderError::Rpc { code, message } => (code.as_ref(), message.as_deref()),
    };

    if let Some(classified) = code.and_then(classify_code) {
        return classified;
    }

    if let Some(text) = message {
        if let Some(classified) = classify_message(text) {
            return classified;
        }
        return ClassifiedError::new(ErrorCategory::Generic, text);
    }

    ClassifiedError::new(ErrorCategory::Unknown, MSG_UNKNOWN)
}

fn classify_code(code: &ErrorCode) -> Option<ClassifiedError> {
    let (category, message) = match code {
        ErrorCode::Numeric(n) => NUMERIC_CODES
            .iter()
            .find(|(c, _, _)| c == n)
            .map(|(_, category, message)| (*category, *message))?,
        ErrorCode::Named(name) => NAMED_CODES
            .iter()
            .find(|(c, _, _)| *c == name.as_str())
            .map(|(_, category, message)| (*category, *message))?,
    };
    Some(ClassifiedError::new(category, message))
}

fn classify_message(text: &str) -> Option<ClassifiedError> {
    let lower = text.to_lowercase();
    MESSAGE_HINTS
        .iter()
        .find(|(hint, _, _)| lower.contains(hint))
        .map(|(_, category, message)| ClassifiedError::new(*category, *message))
}
