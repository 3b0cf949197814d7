//! 服务端配置
//!
//! JSON 文件，默认位于 `<config_dir>/tictactoe/server.json`。

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use protocol::{NetworkConfig, MAX_CONNECTIONS};

/// 服务端配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub network: NetworkConfig,
    /// 同时服务的最大连接数
    pub max_connections: usize,
    /// 服务端回合检查，关闭后按原始宽松规则转发所有合法格子的落子
    pub strict_turns: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            max_connections: MAX_CONNECTIONS,
            strict_turns: true,
        }
    }
}

impl ServerConfig {
    /// 默认配置文件路径
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("tictactoe");
            path.push("server.json");
            path
        })
    }

    /// 从指定文件加载
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {:?}", path))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("配置文件格式无效: {:?}", path))?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// 加载配置
    ///
    /// 显式指定的文件必须可读且有效；默认路径下的文件缺失或无效时使用默认配置。
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from(path);
        }

        let Some(path) = Self::default_path() else {
            warn!("No config directory available, using defaults");
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }

        match Self::load_from(&path) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("{:#}, using defaults", e);
                Ok(Self::default())
            }
        }
    }
}
