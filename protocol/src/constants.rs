//! 协议常量定义

use std::time::Duration;

/// 棋盘边长（3x3）
pub const BOARD_SIZE: usize = 3;

/// 棋盘格子总数
pub const CELL_COUNT: usize = BOARD_SIZE * BOARD_SIZE;

/// 默认服务端端口
pub const DEFAULT_PORT: u16 = 5001;

/// 默认服务端地址
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// 单行消息最大字节数
pub const MAX_LINE_LEN: usize = 256;

/// 服务端最大连接数
pub const MAX_CONNECTIONS: usize = 200;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(CONNECT_TIMEOUT_SECS);
