//! 多链配置模块
//!
//! 定义会话可选择的网络集合（启动时固定，不可变）

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 网络定义
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// 链 ID (EIP-155)
    pub id: u64,
    /// 网络名称
    pub name: String,
    /// 原生币符号 (ETH, MATIC, tBNB, ...)
    pub native_symbol: String,
    /// 原生币精度
    pub native_decimals: u8,
    /// 是否为测试网
    pub is_testnet: bool,
}

/// 链配置注册表
pub struct ChainRegistry {
    configs: HashMap<u64, Network>,
    /// 注册顺序，第一项为默认网络
    order: Vec<u64>,
}

impl ChainRegistry {
    /// 创建预配置的注册表
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_default_chains();
        registry
    }

    /// 空注册表（测试或自定义网络集合）
    pub fn empty() -> Self {
        Self {
            configs: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// 注册默认支持的链
    fn register_default_chains(&mut self) {
        // Ethereum Sepolia
        self.register(Network {
            id: 11155111,
            name: "Sepolia".to_string(),
            native_symbol: "ETH".to_string(),
            native_decimals: 18,
            is_testnet: true,
        });

        // Polygon Amoy
        self.register(Network {
            id: 80002,
            name: "Amoy".to_string(),
            native_symbol: "MATIC".to_string(),
            native_decimals: 18,
            is_testnet: true,
        });

        // BNB Smart Chain Testnet
        self.register(Network {
            id: 97,
            name: "BSC Testnet".to_string(),
            native_symbol: "tBNB".to_string(),
            native_decimals: 18,
            is_testnet: true,
        });
    }

    /// 注册网络；重复 ID 覆盖旧定义但保留原顺序
    pub fn register(&mut self, network: Network) {
        let id = network.id;
        if self.configs.insert(id, network).is_none() {
            self.order.push(id);
        }
    }

    /// 通过 chain_id 获取配置
    pub fn get_by_chain_id(&self, chain_id: u64) -> Option<&Network> {
        self.configs.get(&chain_id)
    }

    /// 通过名称获取配置（不区分大小写）
    pub fn get_by_name(&self, name: &str) -> Option<&Network> {
        self.list_all()
            .into_iter()
            .find(|n| n.name.eq_ignore_ascii_case(name))
    }

    /// 按链 ID 或名称解析
    pub fn resolve(&self, id_or_name: &str) -> Option<&Network> {
        match id_or_name.trim().parse::<u64>() {
            Ok(id) => self.get_by_chain_id(id),
            Err(_) => self.get_by_name(id_or_name.trim()),
        }
    }

    /// 默认网络（注册顺序第一项）
    pub fn default_network(&self) -> Option<&Network> {
        self.order.first().and_then(|id| self.configs.get(id))
    }

    pub fn contains(&self, chain_id: u64) -> bool {
        self.configs.contains_key(&chain_id)
    }

    /// 按注册顺序列出所有网络
    pub fn list_all(&self) -> Vec<&Network> {
        self.order
            .iter()
            .filter_map(|id| self.configs.get(id))
            .collect()
    }

    /// 验证配置完整性
    pub fn validate_configs(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for network in self.list_all() {
            if network.id == 0 {
                errors.push(format!("Network {} has invalid chain id 0", network.name));
            }
            if network.name.is_empty() {
                errors.push(format!("Network {} has empty name", network.id));
            }
            if network.native_symbol.is_empty() {
                errors.push(format!("Network {} has empty native symbol", network.id));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::new()
    }
}
