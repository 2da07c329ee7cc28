//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{ChainRegistry, Network};

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub logging: LoggingConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub session: SessionConfig,
    /// 追加或覆盖内置网络
    #[serde(default)]
    pub networks: Vec<Network>,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
    pub enable_file_logging: bool,
    pub log_file_path: Option<String>,
}

/// 钱包协作方配置（EIP-1193 风格 JSON-RPC 端点）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    pub rpc_url: String,
    pub receipt_poll_interval_ms: u64,
    /// 确认等待超时；不设置则无限等待
    #[serde(default)]
    pub confirmation_timeout_secs: Option<u64>,
}

/// 会话配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub default_chain_id: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
            enable_file_logging: std::env::var("LOG_FILE_ENABLED")
                .ok()
                .map(|v| v == "1")
                .unwrap_or(false),
            log_file_path: std::env::var("LOG_FILE_PATH").ok(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            rpc_url: std::env::var("WALLET_RPC_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8545".into()),
            receipt_poll_interval_ms: std::env::var("RECEIPT_POLL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2000),
            confirmation_timeout_secs: std::env::var("CONFIRMATION_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            // Sepolia
            default_chain_id: std::env::var("DEFAULT_CHAIN_ID")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(11155111),
        }
    }
}

impl WalletConfig {
    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    pub fn confirmation_timeout(&self) -> Option<Duration> {
        self.confirmation_timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            logging: LoggingConfig::default(),
            wallet: WalletConfig::default(),
            session: SessionConfig::default(),
            networks: Vec::new(),
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                config = Self::from_file(path)?;
            }
        }

        Ok(config)
    }

    /// 内置网络 + 配置文件中的网络
    pub fn chain_registry(&self) -> ChainRegistry {
        let mut registry = ChainRegistry::new();
        for network in &self.networks {
            registry.register(network.clone());
        }
        registry
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        // 验证日志级别
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        // 验证日志格式
        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        if !self.wallet.rpc_url.starts_with("http://")
            && !self.wallet.rpc_url.starts_with("https://")
        {
            anyhow::bail!("WALLET_RPC_URL must start with http:// or https://");
        }

        if self.wallet.receipt_poll_interval_ms == 0 {
            anyhow::bail!("RECEIPT_POLL_INTERVAL_MS must be greater than 0");
        }

        let registry = self.chain_registry();
        if let Err(errors) = registry.validate_configs() {
            anyhow::bail!("Invalid network configuration: {}", errors.join("; "));
        }
        if !registry.contains(self.session.default_chain_id) {
            anyhow::bail!(
                "DEFAULT_CHAIN_ID {} is not a supported network",
                self.session.default_chain_id
            );
        }

        Ok(())
    }
}
