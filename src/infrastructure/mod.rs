pub mod json_rpc_wallet; // EIP-1193 风格 JSON-RPC 钱包
pub mod logging;

pub use json_rpc_wallet::JsonRpcWallet;
