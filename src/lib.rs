//! Token Transfer - 钱包转账校验与状态生命周期核心
//!
//! 非托管模式：签名、广播与 gas 估算全部交给钱包协作方，本 crate 只负责
//! 输入校验、错误分类、转账状态机与余额缓存。

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod service;
pub mod utils;

// 重新导出常用类型
pub use error::{AppError, AppResult, ClassifiedError, ErrorCategory, ProviderError};

// 统一模块导出
pub mod prelude {
    pub use crate::{
        domain::{
            Balance, ChainRegistry, Network, TokenDescriptor, TransferKind, TransferPhase,
            TransferRequest, TransferStatus,
        },
        error::{AppError, AppResult, ClassifiedError, ErrorCategory, ProviderError},
        service::{Capabilities, WalletSession},
        utils::{validate_address, validate_amount},
    };
}
