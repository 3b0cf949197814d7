//! 井字棋客户端
//!
//! 包含:
//! - 客户端协议状态机（身份、回合、再来一局）
//! - 界面协作者接口与终端实现
//! - 会话驱动（网络读任务 + 用户意图）
//! - 客户端设置

pub mod config;
pub mod console;
pub mod game;
pub mod network;
pub mod view;

pub use config::ClientConfig;
pub use console::{spawn_stdin_intents, ConsoleView};
pub use game::{parse_intent, ClientMachine, Intent, Phase, Reaction, Scoreboard, SessionEnd};
pub use network::{connect, run_session};
pub use view::GameView;
