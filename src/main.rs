//! token-transfer 命令行入口
//! 通过 JSON-RPC 钱包端点查询余额、发起原生币或 ERC20 转账

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use token_transfer::{
    config::Config,
    domain::{Asset, ChainRegistry, Network, TransferKind},
    infrastructure::{logging, JsonRpcWallet},
    service::{Capabilities, WalletSession},
    utils::AddressValidator,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Opt {
    /// TOML 配置文件路径；不存在时仅使用环境变量
    #[clap(long, env = "CONFIG_PATH", global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: SubCmd,
}

#[derive(Subcommand)]
enum SubCmd {
    /// 列出支持的网络
    Networks,
    /// 查询当前账户余额
    Balance {
        /// 链 ID 或网络名称
        #[clap(long)]
        chain: Option<String>,
        /// ERC20 合约地址
        #[clap(long)]
        token: Option<String>,
    },
    /// 发起转账
    Send {
        #[clap(long)]
        to: String,
        /// 十进制金额（显示单位）
        #[clap(long)]
        amount: String,
        /// ERC20 合约地址；不填则转原生币
        #[clap(long)]
        token: Option<String>,
        #[clap(long)]
        chain: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let opt = Opt::parse();

    let config = Config::from_env_and_file(opt.config.as_ref())?;
    let _log_guard = logging::init_logging(&config.logging)?;
    config.validate().context("Invalid configuration")?;

    let registry = Arc::new(config.chain_registry());

    match opt.command {
        SubCmd::Networks => {
            for network in registry.list_all() {
                println!(
                    "{:>10}  {:<14} {:<6} {}",
                    network.id,
                    network.name,
                    network.native_symbol,
                    if network.is_testnet { "testnet" } else { "mainnet" }
                );
            }
            Ok(())
        }
        SubCmd::Balance { chain, token } => {
            let session = open_session(&config, registry.clone()).await?;
            select_chain(&session, &registry, chain.as_deref()).await?;
            if let Some(token) = token {
                session.set_token_address(token).await;
                session.resolve_token().await?;
            }

            let network = session.selected_network().await?;
            let symbol = session.token().await.map(|t| t.symbol);
            for (asset, balance) in session.refresh_balances().await? {
                let unit = match asset {
                    Asset::Native => network.native_symbol.as_str(),
                    Asset::Token(_) => symbol.as_deref().unwrap_or("?"),
                };
                println!("{} {}", balance.formatted(), unit);
            }
            Ok(())
        }
        SubCmd::Send {
            to,
            amount,
            token,
            chain,
        } => {
            let session = open_session(&config, registry.clone()).await?;
            select_chain(&session, &registry, chain.as_deref()).await?;

            match token {
                Some(token) => {
                    session.set_kind(TransferKind::Erc20).await;
                    session.set_token_address(token).await;
                }
                None => session.set_kind(TransferKind::Native).await,
            }
            session.set_recipient(to).await;
            session.set_amount(amount).await;

            // 打印状态变化
            let mut status = session.subscribe_status();
            let printer = tokio::spawn(async move {
                while status.changed().await.is_ok() {
                    let message = status.borrow_and_update().message().map(str::to_string);
                    if let Some(message) = message {
                        eprintln!("{}", message);
                    }
                }
            });

            let result = session.submit().await;
            drop(session);
            let _ = printer.await;

            let receipt = result?;
            println!("{:#x}", receipt.tx_hash);
            Ok(())
        }
    }
}

async fn open_session(config: &Config, registry: Arc<ChainRegistry>) -> Result<WalletSession> {
    let wallet = Arc::new(JsonRpcWallet::new(
        &config.wallet.rpc_url,
        config.wallet.receipt_poll_interval(),
    )?);
    let session = WalletSession::new(
        Capabilities::from_provider(wallet),
        registry,
        config.session.default_chain_id,
        config.wallet.confirmation_timeout(),
    )?;

    let account = session.connect().await?;
    tracing::info!(account = %AddressValidator::to_checksum(&account), "Session ready");
    Ok(session)
}

async fn select_chain(
    session: &WalletSession,
    registry: &ChainRegistry,
    chain: Option<&str>,
) -> Result<()> {
    let Some(chain) = chain else {
        return Ok(());
    };
    let target: &Network = registry
        .resolve(chain)
        .with_context(|| format!("Unknown network: {}", chain))?;
    if session.selected_network().await?.id != target.id {
        session.switch_network(target.id).await?;
    }
    Ok(())
}
