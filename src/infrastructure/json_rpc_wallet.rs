//! JSON-RPC 钱包适配器
//!
//! 面向 EIP-1193 风格端点（钱包桥接或解锁账户的节点），实现会话所需的全部能力。
//! 签名、gas 估算与 nonce 均由端点负责；这里只拼请求与解码结果。

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use ethers::{
    abi::{self, ParamType, Token},
    providers::{Http, Middleware, Provider},
    types::{transaction::eip2718::TypedTransaction, Address, Bytes, TransactionRequest, TxHash, U256},
};
use tokio::sync::RwLock;

use crate::{
    domain::{Balance, TokenMetadata},
    error::{ErrorCode, ProviderError},
    service::capabilities::{
        Confirmation, ConfirmationWatch, ContractTransferSubmit, LedgerQuery,
        NativeTransferSubmit, NetworkSwitch, WalletConnection,
    },
};

/// 原生币默认精度；缓存按网络定义覆盖
const NATIVE_DECIMALS: u8 = 18;

/// 回执轮询允许的连续失败次数
const MAX_POLL_ERRORS: u32 = 3;

/// JSON-RPC "method not found"
const METHOD_NOT_FOUND: i64 = -32601;

pub struct JsonRpcWallet {
    provider: Provider<Http>,
    poll_interval: Duration,
    account: RwLock<Option<Address>>,
}

impl JsonRpcWallet {
    pub fn new(rpc_url: &str, poll_interval: Duration) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .with_context(|| format!("Invalid wallet RPC url: {}", rpc_url))?;
        Ok(Self {
            provider,
            poll_interval,
            account: RwLock::new(None),
        })
    }

    async fn from_address(&self) -> Result<Address, ProviderError> {
        self.account
            .read()
            .await
            .ok_or_else(|| ProviderError::Message("Wallet is not connected".to_string()))
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, ProviderError> {
        // 交由钱包端填充 gas / nonce 并签名
        let tx_hash: TxHash = self
            .provider
            .request("eth_sendTransaction", [tx])
            .await?;
        Ok(tx_hash)
    }

    async fn call(&self, contract: Address, data: Vec<u8>) -> Result<Bytes, ProviderError> {
        let tx: TypedTransaction = TransactionRequest::new().to(contract).data(data).into();
        Ok(self.provider.call(&tx, None).await?)
    }
}

fn is_method_not_found(err: &ProviderError) -> bool {
    matches!(
        err,
        ProviderError::Rpc {
            code: Some(ErrorCode::Numeric(METHOD_NOT_FOUND)),
            ..
        }
    )
}

/// `transfer(address,uint256)` 调用数据
pub fn encode_transfer(to: Address, amount: U256) -> Vec<u8> {
    encode_call(
        "transfer",
        &[ParamType::Address, ParamType::Uint(256)],
        &[Token::Address(to), Token::Uint(amount)],
    )
}

fn encode_call(name: &str, params: &[ParamType], args: &[Token]) -> Vec<u8> {
    let mut data = abi::short_signature(name, params).to_vec();
    data.extend(abi::encode(args));
    data
}

fn decode_uint(output: &[u8]) -> Result<U256, ProviderError> {
    abi::decode(&[ParamType::Uint(256)], output)
        .ok()
        .and_then(|tokens| tokens.into_iter().next())
        .and_then(Token::into_uint)
        .ok_or_else(|| ProviderError::rpc("CONTRACT_ERROR", "Unexpected uint return data"))
}

/// `symbol()` 返回 string；部分早期代币返回 bytes32
fn decode_symbol(output: &[u8]) -> Result<String, ProviderError> {
    if let Some(symbol) = abi::decode(&[ParamType::String], output)
        .ok()
        .and_then(|tokens| tokens.into_iter().next())
        .and_then(Token::into_string)
    {
        return Ok(symbol);
    }

    abi::decode(&[ParamType::FixedBytes(32)], output)
        .ok()
        .and_then(|tokens| tokens.into_iter().next())
        .and_then(Token::into_fixed_bytes)
        .map(|bytes| {
            let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
            String::from_utf8_lossy(&bytes[..end]).into_owned()
        })
        .ok_or_else(|| ProviderError::rpc("CONTRACT_ERROR", "Unexpected symbol return data"))
}

#[async_trait]
impl WalletConnection for JsonRpcWallet {
    async fn connect(&self) -> Result<Address, ProviderError> {
        let accounts: Vec<Address> = match self.provider.request("eth_requestAccounts", ()).await {
            Ok(accounts) => accounts,
            Err(e) => {
                let err = ProviderError::from(e);
                if !is_method_not_found(&err) {
                    return Err(err);
                }
                // 普通节点不支持 eth_requestAccounts
                tracing::debug!("eth_requestAccounts unsupported, falling back to eth_accounts");
                self.provider.get_accounts().await?
            }
        };

        let account = accounts
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Message("No accounts available in wallet".to_string()))?;
        *self.account.write().await = Some(account);
        Ok(account)
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        *self.account.write().await = None;
        Ok(())
    }

    async fn account(&self) -> Option<Address> {
        *self.account.read().await
    }

    async fn active_chain_id(&self) -> Result<u64, ProviderError> {
        Ok(self.provider.get_chainid().await?.low_u64())
    }
}

#[async_trait]
impl NetworkSwitch for JsonRpcWallet {
    async fn switch_network(&self, chain_id: u64) -> Result<(), ProviderError> {
        let params = serde_json::json!([{ "chainId": format!("0x{:x}", chain_id) }]);
        let _: serde_json::Value = self
            .provider
            .request("wallet_switchEthereumChain", params)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl NativeTransferSubmit for JsonRpcWallet {
    async fn send(&self, to: Address, value: U256) -> Result<TxHash, ProviderError> {
        let from = self.from_address().await?;
        let tx = TransactionRequest::new().from(from).to(to).value(value);
        self.send_transaction(tx).await
    }
}

#[async_trait]
impl ContractTransferSubmit for JsonRpcWallet {
    async fn call_transfer(
        &self,
        contract: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxHash, ProviderError> {
        let from = self.from_address().await?;
        let tx = TransactionRequest::new()
            .from(from)
            .to(contract)
            .data(encode_transfer(to, amount));
        self.send_transaction(tx).await
    }
}

#[async_trait]
impl ConfirmationWatch for JsonRpcWallet {
    async fn await_confirmation(&self, tx_hash: TxHash) -> Result<Confirmation, ProviderError> {
        let mut failures = 0;
        loop {
            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    // 拜占庭前的回执没有 status 字段
                    let ok = receipt.status.map_or(true, |s| s.as_u64() == 1);
                    tracing::debug!(
                        tx_hash = %format!("{:#x}", tx_hash),
                        block = ?receipt.block_number,
                        ok,
                        "Receipt received"
                    );
                    return Ok(if ok {
                        Confirmation::Confirmed
                    } else {
                        Confirmation::Failed
                    });
                }
                Ok(None) => failures = 0,
                Err(e) => {
                    failures += 1;
                    tracing::warn!(
                        tx_hash = %format!("{:#x}", tx_hash),
                        attempt = failures,
                        error = %e,
                        "Receipt poll failed"
                    );
                    if failures >= MAX_POLL_ERRORS {
                        return Err(e.into());
                    }
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl LedgerQuery for JsonRpcWallet {
    async fn native_balance_of(&self, account: Address) -> Result<Balance, ProviderError> {
        let raw = self.provider.get_balance(account, None).await?;
        Ok(Balance::new(raw, NATIVE_DECIMALS))
    }

    async fn token_balance_of(
        &self,
        contract: Address,
        account: Address,
    ) -> Result<U256, ProviderError> {
        let data = encode_call("balanceOf", &[ParamType::Address], &[Token::Address(account)]);
        let output = self.call(contract, data).await?;
        decode_uint(&output)
    }

    async fn token_metadata(&self, contract: Address) -> Result<TokenMetadata, ProviderError> {
        let (decimals, symbol) = futures::join!(
            self.call(contract, encode_call("decimals", &[], &[])),
            self.call(contract, encode_call("symbol", &[], &[])),
        );

        let decimals = decode_uint(&decimals?)?;
        if decimals > U256::from(u8::MAX) {
            return Err(ProviderError::rpc(
                "CONTRACT_ERROR",
                format!("Token decimals out of range: {}", decimals),
            ));
        }

        Ok(TokenMetadata {
            decimals: decimals.low_u32() as u8,
            symbol: decode_symbol(&symbol?)?,
        })
    }
}
