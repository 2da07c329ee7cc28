pub mod balance_cache;
pub mod capabilities;
pub mod error_classifier;
pub mod session; // 会话：连接、网络、草稿、刷新
pub mod transfer_machine; // 转账状态机（单飞）
pub mod validator;

pub use balance_cache::{BalanceCache, BalanceKey};
pub use capabilities::{
    Capabilities, Confirmation, ConfirmationWatch, ContractTransferSubmit, LedgerQuery,
    NativeTransferSubmit, NetworkSwitch, WalletConnection,
};
pub use error_classifier::classify;
pub use session::WalletSession;
pub use transfer_machine::TransferStatusMachine;
pub use validator::ValidationError;
