//! 网络通信模块
//!
//! 后台读任务把服务端消息送入通道，会话驱动在同一个任务里
//! 依次处理服务端消息和用户意图，因此状态机无需加锁。

mod connection;

pub use connection::*;
