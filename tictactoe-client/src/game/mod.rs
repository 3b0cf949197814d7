//! 游戏逻辑模块
//!
//! 客户端协议状态机与用户意图

mod input;
mod state;

pub use input::*;
pub use state::*;
