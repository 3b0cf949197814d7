//! 井字棋共享协议库
//!
//! 包含:
//! - 符号、格子、棋盘等核心数据结构
//! - 胜负/和棋判定
//! - 消息类型定义 (ClientMessage, ServerMessage)，文本行格式
//! - 传输层抽象 (Connector, Connection, Listener traits)
//! - 行编解码 (LineReader, LineWriter)

mod board;
mod constants;
mod error;
mod message;
mod symbol;
mod transport;

pub use board::{Board, GameResult, Outcome};
pub use constants::*;
pub use error::{GameError, ProtocolError, Result};
pub use message::{ClientMessage, RejectReason, ServerMessage};
pub use symbol::{Cell, Symbol};
pub use transport::{
    Connection, Connector, Listener,
    TcpConnection, TcpConnector, TcpListener,
    NetworkConfig,
    LineReader, LineWriter,
};
