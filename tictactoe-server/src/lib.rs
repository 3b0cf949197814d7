//! 井字棋服务端
//!
//! 包含:
//! - 会话（棋盘 + 回合 + 连接注册表）
//! - 命令分发
//! - 网络监听与连接处理
//! - 配置加载

pub mod config;
pub mod network;
pub mod registry;
pub mod server;
pub mod session;

pub use config::ServerConfig;
pub use network::{serve_connection, GameServer};
pub use registry::{JoinOrdinal, PeerId, Registry};
pub use server::{MessageHandler, Outbox};
pub use session::{MoveOutcome, Session};
