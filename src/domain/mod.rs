//! Domain 模块
//!
//! 网络、代币、转账请求与状态等领域模型

pub mod chain_config;
pub mod token;
pub mod transfer;
pub mod transfer_status;

pub use chain_config::{ChainRegistry, Network};
pub use token::{to_smallest_unit, Asset, Balance, TokenDescriptor, TokenMetadata, UnitsError};
pub use transfer::{
    PreparedTransfer, TransferDraft, TransferKind, TransferReceipt, TransferRequest,
};
pub use transfer_status::{TransferPhase, TransferStatus};
