//! 统一错误定义
//!
//! - `ErrorCategory`：面向用户的错误分类
//! - `ClassifiedError`：分类 + 用户可读文案
//! - `ProviderError`：钱包/RPC 协作方返回的原始错误（不透明）
//! - `AppError`：crate 级错误

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// 输入校验失败（未触达任何外部能力）
    Validation,
    UserRejected,
    InsufficientFunds,
    /// Gas 估算/限制/价格相关
    GasError,
    NonceConflict,
    NetworkError,
    ChainMismatch,
    ContractError,
    /// 钱包正在处理另一请求
    ProviderBusy,
    /// 确认等待超时
    Timeout,
    /// 原样透传的错误信息
    Generic,
    Unknown,
}

impl ErrorCategory {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::UserRejected => "user_rejected",
            Self::InsufficientFunds => "insufficient_funds",
            Self::GasError => "gas_error",
            Self::NonceConflict => "nonce_conflict",
            Self::NetworkError => "network_error",
            Self::ChainMismatch => "chain_mismatch",
            Self::ContractError => "contract_error",
            Self::ProviderBusy => "provider_busy",
            Self::Timeout => "timeout",
            Self::Generic => "generic",
            Self::Unknown => "unknown",
        }
    }

    /// 前端显示用的国际化 key
    pub fn to_i18n_key(&self) -> String {
        format!("transfer.error.{}", self.code())
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// 已分类的错误（分类 + 用户可读文案）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct ClassifiedError {
    pub category: ErrorCategory,
    pub message: String,
}

impl ClassifiedError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Validation, message)
    }
}

/// 协作方错误码：数值（JSON-RPC / EIP-1193）或命名码
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    Numeric(i64),
    Named(String),
}

impl From<i64> for ErrorCode {
    fn from(code: i64) -> Self {
        Self::Numeric(code)
    }
}

impl From<&str> for ErrorCode {
    fn from(code: &str) -> Self {
        Self::Named(code.to_string())
    }
}

/// 钱包/RPC 协作方返回的原始错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// 协作方直接抛出的字符串
    #[error("{0}")]
    Message(String),
    /// 结构化错误：可选错误码 + 可选文案
    #[error("provider error (code: {code:?}): {}", message.as_deref().unwrap_or("<none>"))]
    Rpc {
        code: Option<ErrorCode>,
        message: Option<String>,
    },
}

impl ProviderError {
    pub fn rpc(code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        Self::Rpc {
            code: Some(code.into()),
            message: Some(message.into()),
        }
    }

    pub fn with_code(code: impl Into<ErrorCode>) -> Self {
        Self::Rpc {
            code: Some(code.into()),
            message: None,
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self::Rpc {
            code: None,
            message: Some(message.into()),
        }
    }
}

impl From<ethers::providers::ProviderError> for ProviderError {
    fn from(err: ethers::providers::ProviderError) -> Self {
        use ethers::providers::RpcError;

        if let Some(resp) = err.as_error_response() {
            return Self::rpc(resp.code, resp.message.clone());
        }

        match err {
            ethers::providers::ProviderError::HTTPError(e) => Self::rpc("NETWORK_ERROR", e.to_string()),
            other => Self::Message(other.to_string()),
        }
    }
}

/// crate 级错误
#[derive(Debug, Error)]
pub enum AppError {
    /// 占位持续到成功后的余额刷新结束，状态已是 Success 时也可能返回
    #[error("a transfer is already in flight for this session")]
    TransferInFlight,

    #[error("validation was superseded by a newer edit")]
    Superseded,

    #[error("wallet is not connected")]
    NotConnected,

    #[error("unsupported network: {0}")]
    UnsupportedNetwork(u64),

    #[error(transparent)]
    Classified(#[from] ClassifiedError),
}

impl AppError {
    /// 取出分类信息（若有）
    pub fn classified(&self) -> Option<&ClassifiedError> {
        match self {
            Self::Classified(e) => Some(e),
            _ => None,
        }
    }

    pub fn category(&self) -> Option<ErrorCategory> {
        self.classified().map(|e| e.category)
    }
}

pub type AppResult<T> = Result<T, AppError>;
