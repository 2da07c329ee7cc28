//! 会话集成测试：连接、网络切换、代币解析与账户变更

mod common;

use std::sync::{atomic::Ordering, Arc};

use common::*;
use ethers::types::{Address, U256};
use token_transfer::{
    domain::{
        transfer_status::{MSG_CONNECTED, MSG_REFRESHED},
        Asset, TransferPhase, TransferStatus,
    },
    error::{AppError, ErrorCategory, ProviderError},
};

#[tokio::test]
async fn test_connect_fetches_balances() {
    let wallet = Arc::new(MockWallet::new(milli_eth(1500)));
    wallet.set_chain(AMOY);
    let session = session(wallet.clone());

    assert!(session.balances().await.is_empty());
    let account = session.connect().await.unwrap();

    assert_eq!(account, wallet.account);
    assert_eq!(session.account().await, Some(account));
    // 跟随钱包当前网络
    assert_eq!(session.selected_network().await.unwrap().id, AMOY);
    assert_eq!(session.status(), TransferStatus::success(MSG_CONNECTED));
    assert_eq!(session.refresh_status(), TransferStatus::success(MSG_REFRESHED));
    assert_eq!(session.balances().await.len(), 1);
}

#[tokio::test]
async fn test_connect_rejected_by_user() {
    let wallet = Arc::new(MockWallet::new(milli_eth(1500)));
    *wallet.connect_error.lock().unwrap() = Some(ProviderError::with_code(4001));
    let session = session(wallet.clone());

    let err = session.connect().await.unwrap_err();
    assert_eq!(err.category(), Some(ErrorCategory::UserRejected));
    assert!(session.status().is_error());
    assert_eq!(session.account().await, None);
    assert_eq!(wallet.native_balance_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_submit_requires_connection() {
    let wallet = Arc::new(MockWallet::new(milli_eth(1500)));
    let session = session(wallet.clone());

    session.set_recipient(RECIPIENT).await;
    session.set_amount("0.01").await;
    assert!(matches!(session.submit().await, Err(AppError::NotConnected)));
    assert!(matches!(
        session.refresh_balances().await,
        Err(AppError::NotConnected)
    ));
    assert_eq!(session.phase(), TransferPhase::Idle);
}

#[tokio::test]
async fn test_switch_network() {
    let (wallet, session) = connected(MockWallet::new(milli_eth(1500))).await;

    let network = session.switch_network(AMOY).await.unwrap();
    assert_eq!(network.name, "Amoy");
    assert_eq!(session.selected_network().await.unwrap().id, AMOY);
    assert_eq!(
        session.status(),
        TransferStatus::success("Switched to Amoy network")
    );
    // 新网络的余额已查询，旧网络条目不展示
    let balances = session.balances().await;
    assert_eq!(balances.len(), 1);
    assert_eq!(wallet.native_balance_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_switch_network_failure_keeps_selection() {
    let (wallet, session) = connected(MockWallet::new(milli_eth(1500))).await;
    wallet.fail_switch(ProviderError::rpc(4902, "Unrecognized chain ID \"0x61\"."));

    let err = session.switch_network(97).await.unwrap_err();
    assert_eq!(err.category(), Some(ErrorCategory::ChainMismatch));
    assert_eq!(session.selected_network().await.unwrap().id, SEPOLIA);
    assert!(session.status().is_error());
}

#[tokio::test]
async fn test_switch_to_unknown_network() {
    let (wallet, session) = connected(MockWallet::new(milli_eth(1500))).await;

    assert!(matches!(
        session.switch_network(1).await,
        Err(AppError::UnsupportedNetwork(1))
    ));
    assert_eq!(wallet.switch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_token_resolution_is_cached_per_address() {
    let other = Address::repeat_byte(0xdd);
    let wallet = MockWallet::new(milli_eth(1500))
        .with_token(token_contract(), 6, "USDC", U256::from(5_000_000u64))
        .with_token(other, 18, "DAI", U256::zero());
    let (wallet, session) = connected(wallet).await;

    session.set_token_address(token_contract_str()).await;
    let first = session.resolve_token().await.unwrap().unwrap();
    let second = session.resolve_token().await.unwrap().unwrap();
    assert_eq!(first, second);
    assert_eq!(first.symbol, "USDC");
    assert_eq!(first.decimals, 6);
    assert_eq!(wallet.metadata_calls.load(Ordering::SeqCst), 1);

    // 地址变化后重新解析
    session.set_token_address(format!("{:#x}", other)).await;
    assert!(session.token().await.is_none());
    let dai = session.resolve_token().await.unwrap().unwrap();
    assert_eq!(dai.symbol, "DAI");
    assert_eq!(wallet.metadata_calls.load(Ordering::SeqCst), 2);

    // 已解析的代币参与余额刷新
    let balances = session.refresh_balances().await.unwrap();
    assert!(balances.iter().any(|(asset, _)| *asset == Asset::Token(other)));
}

#[tokio::test]
async fn test_invalid_token_address() {
    let (wallet, session) = connected(MockWallet::new(milli_eth(1500))).await;

    session.set_token_address("0xnotanaddress").await;
    let err = session.resolve_token().await.unwrap_err();
    assert_eq!(err.category(), Some(ErrorCategory::Validation));
    assert_eq!(err.to_string(), "Invalid token contract address");
    assert_eq!(wallet.metadata_calls.load(Ordering::SeqCst), 0);

    session.set_token_address("").await;
    assert_eq!(session.resolve_token().await.unwrap(), None);
}

#[tokio::test]
async fn test_account_change_invalidates_cache() {
    let (wallet, session) = connected(MockWallet::new(milli_eth(1500))).await;
    assert_eq!(wallet.native_balance_calls.load(Ordering::SeqCst), 1);

    let other = Address::repeat_byte(0xbb);
    session.on_account_changed(Some(other)).await;
    assert_eq!(session.account().await, Some(other));
    assert_eq!(wallet.native_balance_calls.load(Ordering::SeqCst), 2);
    assert_eq!(session.balances().await.len(), 1);

    // 同一账户不重复查询
    session.on_account_changed(Some(other)).await;
    assert_eq!(wallet.native_balance_calls.load(Ordering::SeqCst), 2);

    session.on_account_changed(None).await;
    assert!(session.balances().await.is_empty());
}

#[tokio::test]
async fn test_chain_change_event() {
    let (wallet, session) = connected(MockWallet::new(milli_eth(1500))).await;

    session.on_chain_changed(AMOY).await;
    assert_eq!(session.selected_network().await.unwrap().id, AMOY);
    assert_eq!(wallet.native_balance_calls.load(Ordering::SeqCst), 2);

    session.on_chain_changed(1).await;
    assert_eq!(session.selected_network().await.unwrap().id, AMOY);
    assert!(session.status().is_error());
}

#[tokio::test]
async fn test_connect_on_unsupported_network_caches_nothing() {
    let wallet = Arc::new(MockWallet::new(milli_eth(1500)));
    wallet.set_chain(1);
    let session = session(wallet.clone());

    session.connect().await.unwrap();
    assert_eq!(session.selected_network().await.unwrap().id, SEPOLIA);
    assert!(session.balances().await.is_empty());
    assert_eq!(wallet.native_balance_calls.load(Ordering::SeqCst), 0);
    assert!(matches!(
        session.refresh_status(),
        TransferStatus::Error {
            category: ErrorCategory::ChainMismatch,
            ..
        }
    ));
}

#[tokio::test]
async fn test_refresh_after_wallet_leaves_network_keeps_entries() {
    let (wallet, session) = connected(MockWallet::new(milli_eth(1500))).await;
    let before = session.balances().await;

    wallet.set_chain(1);
    session.on_chain_changed(1).await;
    let err = session.refresh_balances().await.unwrap_err();

    assert_eq!(err.category(), Some(ErrorCategory::ChainMismatch));
    assert!(session.refresh_status().is_error());
    assert_eq!(wallet.native_balance_calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.balances().await, before);
}

#[tokio::test]
async fn test_disconnect() {
    let (_wallet, session) = connected(MockWallet::new(milli_eth(1500))).await;

    session.disconnect().await.unwrap();
    assert_eq!(session.account().await, None);
    assert!(session.balances().await.is_empty());
    assert_eq!(session.status(), TransferStatus::Idle);
    assert_eq!(session.refresh_status(), TransferStatus::Idle);
}

#[tokio::test]
async fn test_status_subscription_sees_latest_only() {
    let (_wallet, session) = connected(MockWallet::new(milli_eth(1500))).await;
    let mut status = session.subscribe_status();
    status.borrow_and_update();

    session.set_recipient(RECIPIENT).await;
    session.set_amount("0.01").await;
    session.submit().await.unwrap();

    assert!(status.has_changed().unwrap());
    assert!(matches!(*status.borrow(), TransferStatus::Success { .. }));
}
