//! 错误类型定义

use thiserror::Error;

/// 棋盘规则错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    /// 坐标越界
    #[error("Invalid position: ({row}, {col})")]
    InvalidPosition { row: u8, col: u8 },

    /// 格子已被占用
    #[error("Invalid move: cell ({row}, {col}) is occupied")]
    InvalidMove { row: u8, col: u8 },
}

/// 协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 无法解析的命令行
    #[error("Malformed command: {line:?}")]
    Malformed { line: String },

    /// 单行超长
    #[error("Line too long: {size} bytes (max: {max})")]
    LineTooLong { size: usize, max: usize },

    /// 非 UTF-8 数据
    #[error("Line is not valid UTF-8")]
    InvalidUtf8,

    /// 连接超时
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// 连接已关闭
    #[error("Connection closed")]
    ConnectionClosed,

    /// 棋盘规则错误
    #[error("Game error: {0}")]
    Game(#[from] GameError),
}

impl ProtocolError {
    /// 构造解析错误
    pub fn malformed(line: impl Into<String>) -> Self {
        ProtocolError::Malformed { line: line.into() }
    }

    /// 是否为对端断开（正常关闭或连接被重置）
    pub fn is_disconnect(&self) -> bool {
        match self {
            ProtocolError::ConnectionClosed => true,
            ProtocolError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, ProtocolError>;
