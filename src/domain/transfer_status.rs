//! 转账状态定义
//!
//! - `TransferStatus`：UI 唯一状态（同一时刻仅一个，覆盖写，不排队）
//! - `TransferPhase`：状态机所处阶段，约束合法转换

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ClassifiedError, ErrorCategory};

pub const MSG_PREPARING: &str = "Preparing transaction...";
pub const MSG_SUBMITTED: &str = "Transaction submitted. Waiting for confirmation...";
pub const MSG_CONFIRMED: &str =
    "Transaction completed successfully! Your transfer has been confirmed on the blockchain.";
pub const MSG_REFRESHING: &str = "Refreshing balances...";
pub const MSG_REFRESHED: &str = "Balances updated successfully";
pub const MSG_CONNECTING: &str = "Connecting wallet...";
pub const MSG_CONNECTED: &str = "Wallet connected successfully";
pub const MSG_SWITCHING: &str = "Switching network...";

/// UI 状态
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransferStatus {
    #[default]
    Idle,
    Validating,
    Info {
        message: String,
    },
    Success {
        message: String,
    },
    Error {
        category: ErrorCategory,
        message: String,
    },
}

impl TransferStatus {
    pub fn info(message: impl Into<String>) -> Self {
        Self::Info {
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::Success {
            message: message.into(),
        }
    }

    pub fn error(err: &ClassifiedError) -> Self {
        Self::Error {
            category: err.category,
            message: err.message.clone(),
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Info { message } | Self::Success { message } | Self::Error { message, .. } => {
                Some(message)
            }
            Self::Idle | Self::Validating => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// 状态机阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferPhase {
    #[default]
    Idle,
    Validating,
    Submitting,
    Confirming,
    Succeeded,
    Failed,
}

impl TransferPhase {
    /// 是否为终态（需用户新操作才回到 Idle）
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// 是否有转账正在进行
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Validating | Self::Submitting | Self::Confirming)
    }

    /// 验证状态转换合法性
    pub fn can_transition_to(&self, target: &Self) -> bool {
        use TransferPhase::*;

        match (self, target) {
            // Idle / 终态 → Validating（新一轮转账）
            (Idle, Validating) | (Succeeded, Validating) | (Failed, Validating) => true,

            // 终态被用户编辑确认 → Idle
            (Succeeded, Idle) | (Failed, Idle) => true,

            // Validating → Submitting | Failed | Idle（被编辑作废）
            (Validating, Submitting) | (Validating, Failed) | (Validating, Idle) => true,

            // Submitting → Confirming | Failed
            (Submitting, Confirming) | (Submitting, Failed) => true,

            // Confirming → Succeeded | Failed
            (Confirming, Succeeded) | (Confirming, Failed) => true,

            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Submitting => "submitting",
            Self::Confirming => "confirming",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
