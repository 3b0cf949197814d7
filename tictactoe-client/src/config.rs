//! 客户端设置
//!
//! 提供设置数据结构与持久化，文件位于 `<config_dir>/tictactoe/client.json`。

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use protocol::NetworkConfig;

/// 客户端设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// 服务器地址
    pub network: NetworkConfig,
    /// 昵称（随 `name` 发送，仅用于服务端日志）
    pub nickname: Option<String>,
    /// 连接后自动加入对局
    pub auto_join: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            nickname: None,
            auto_join: true,
        }
    }
}

impl ClientConfig {
    /// 获取设置文件路径
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("tictactoe");
            path.push("client.json");
            path
        })
    }

    /// 从指定文件加载
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取设置文件: {:?}", path))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("设置文件格式无效: {:?}", path))?;
        info!("Loaded settings from {:?}", path);
        Ok(config)
    }

    /// 加载设置
    ///
    /// 显式指定的文件必须有效；默认位置的文件缺失或无效时使用默认设置。
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from(path);
        }

        let Some(path) = Self::default_path() else {
            warn!("No config directory available, using default settings");
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }

        match Self::load_from(&path) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("{:#}, using default settings", e);
                Ok(Self::default())
            }
        }
    }

    /// 保存设置到文件
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // 确保目录存在
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("无法创建配置目录: {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self).context("序列化设置失败")?;
        std::fs::write(path, content)
            .with_context(|| format!("写入设置文件失败: {:?}", path))?;

        info!("Settings saved: {:?}", path);
        Ok(())
    }

    /// 保存到默认位置
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::default_path().context("无法获取配置目录")?;
        self.save_to(&path)?;
        Ok(path)
    }
}
