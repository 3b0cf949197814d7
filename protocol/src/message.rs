//! 消息类型定义
//!
//! 线上格式为一行一条命令，token 之间以空格分隔，首个 token 为动词。

use std::fmt;
use std::str::FromStr;

use crate::board::GameResult;
use crate::error::ProtocolError;
use crate::symbol::{Cell, Symbol};

/// 客户端发送给服务端的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// 加入对局（昵称仅用于日志）
    Name { nickname: Option<String> },
    /// 落子
    Move { symbol: Symbol, cell: Cell },
    /// 退出
    Exit { symbol: Symbol },
    /// 请求再来一局
    Restart { symbol: Symbol },
    /// 双方都同意再来一局
    Ready,
}

/// 服务端发送给客户端的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// 第一个加入（单播），即分配到 A
    JoinedFirst,
    /// 第二个加入（广播）
    JoinedSecond,
    /// 显式分配符号（单播）
    Assign { symbol: Symbol },
    /// 落子转发
    Move { symbol: Symbol, cell: Cell },
    /// 退出转发
    Exit { symbol: Symbol },
    /// 再来一局转发
    Restart { symbol: Symbol },
    /// 新一局开始
    StartNewGame,
    /// 对局结束
    GameOver { result: GameResult },
    /// 落子被拒绝（单播）
    Rejected { reason: RejectReason },
}

/// 落子被拒绝的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// 尚未加入对局
    NotJoined,
    /// 符号与分配的不一致
    WrongSymbol,
    /// 不是你的回合
    NotYourTurn,
    /// 当前没有进行中的对局
    NotInProgress,
}

impl RejectReason {
    /// 线上 token
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::NotJoined => "not-joined",
            RejectReason::WrongSymbol => "wrong-symbol",
            RejectReason::NotYourTurn => "not-your-turn",
            RejectReason::NotInProgress => "not-in-progress",
        }
    }

    /// 从 token 解析
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "not-joined" => Some(RejectReason::NotJoined),
            "wrong-symbol" => Some(RejectReason::WrongSymbol),
            "not-your-turn" => Some(RejectReason::NotYourTurn),
            "not-in-progress" => Some(RejectReason::NotInProgress),
            _ => None,
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 逐 token 读取一行命令
struct Tokens<'a> {
    line: &'a str,
    inner: std::str::SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            line,
            inner: line.split_whitespace(),
        }
    }

    fn malformed(&self) -> ProtocolError {
        ProtocolError::malformed(self.line)
    }

    fn next(&mut self) -> Result<&'a str, ProtocolError> {
        self.inner.next().ok_or_else(|| self.malformed())
    }

    fn symbol(&mut self) -> Result<Symbol, ProtocolError> {
        let token = self.next()?;
        Symbol::from_token(token).ok_or_else(|| self.malformed())
    }

    fn cell(&mut self) -> Result<Cell, ProtocolError> {
        let row = self.next()?.parse::<u8>().map_err(|_| self.malformed())?;
        let col = self.next()?.parse::<u8>().map_err(|_| self.malformed())?;
        Cell::new(row, col).ok_or_else(|| self.malformed())
    }

    /// 要求已无剩余 token
    fn finish(mut self) -> Result<(), ProtocolError> {
        match self.inner.next() {
            Some(_) => Err(self.malformed()),
            None => Ok(()),
        }
    }
}

impl FromStr for ClientMessage {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut tokens = Tokens::new(line);
        let msg = match tokens.next()? {
            "name" => {
                let nickname = tokens.inner.next().map(str::to_string);
                ClientMessage::Name { nickname }
            }
            "move" => {
                let symbol = tokens.symbol()?;
                let cell = tokens.cell()?;
                ClientMessage::Move { symbol, cell }
            }
            "exit" => ClientMessage::Exit {
                symbol: tokens.symbol()?,
            },
            "restart" => ClientMessage::Restart {
                symbol: tokens.symbol()?,
            },
            "ready" => ClientMessage::Ready,
            _ => return Err(tokens.malformed()),
        };
        tokens.finish()?;
        Ok(msg)
    }
}

impl fmt::Display for ClientMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientMessage::Name { nickname: None } => f.write_str("name"),
            ClientMessage::Name {
                nickname: Some(nickname),
            } => write!(f, "name {}", nickname),
            ClientMessage::Move { symbol, cell } => write!(f, "move {} {}", symbol, cell),
            ClientMessage::Exit { symbol } => write!(f, "exit {}", symbol),
            ClientMessage::Restart { symbol } => write!(f, "restart {}", symbol),
            ClientMessage::Ready => f.write_str("ready"),
        }
    }
}

impl FromStr for ServerMessage {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut tokens = Tokens::new(line);
        let msg = match tokens.next()? {
            "joined-first" => ServerMessage::JoinedFirst,
            "joined-second" => ServerMessage::JoinedSecond,
            "assign" => ServerMessage::Assign {
                symbol: tokens.symbol()?,
            },
            "move" => {
                let symbol = tokens.symbol()?;
                let cell = tokens.cell()?;
                ServerMessage::Move { symbol, cell }
            }
            "exit" => ServerMessage::Exit {
                symbol: tokens.symbol()?,
            },
            "restart" => ServerMessage::Restart {
                symbol: tokens.symbol()?,
            },
            "start-new-game" => ServerMessage::StartNewGame,
            "result" => {
                let token = tokens.next()?;
                let result = GameResult::from_token(token).ok_or_else(|| tokens.malformed())?;
                ServerMessage::GameOver { result }
            }
            "rejected" => {
                let token = tokens.next()?;
                let reason = RejectReason::from_token(token).ok_or_else(|| tokens.malformed())?;
                ServerMessage::Rejected { reason }
            }
            _ => return Err(tokens.malformed()),
        };
        tokens.finish()?;
        Ok(msg)
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::JoinedFirst => f.write_str("joined-first"),
            ServerMessage::JoinedSecond => f.write_str("joined-second"),
            ServerMessage::Assign { symbol } => write!(f, "assign {}", symbol),
            ServerMessage::Move { symbol, cell } => write!(f, "move {} {}", symbol, cell),
            ServerMessage::Exit { symbol } => write!(f, "exit {}", symbol),
            ServerMessage::Restart { symbol } => write!(f, "restart {}", symbol),
            ServerMessage::StartNewGame => f.write_str("start-new-game"),
            ServerMessage::GameOver { result } => write!(f, "result {}", result),
            ServerMessage::Rejected { reason } => write!(f, "rejected {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_client_messages() {
        assert_eq!(
            "name".parse::<ClientMessage>().unwrap(),
            ClientMessage::Name { nickname: None }
        );
        assert_eq!(
            "name alice".parse::<ClientMessage>().unwrap(),
            ClientMessage::Name {
                nickname: Some("alice".to_string())
            }
        );
        assert_eq!(
            "move X 2 1".parse::<ClientMessage>().unwrap(),
            ClientMessage::Move {
                symbol: Symbol::A,
                cell: Cell::new_unchecked(2, 1)
            }
        );
        assert_eq!(
            "  restart B ".parse::<ClientMessage>().unwrap(),
            ClientMessage::Restart { symbol: Symbol::B }
        );
        assert_eq!("ready".parse::<ClientMessage>().unwrap(), ClientMessage::Ready);
    }

    #[test]
    fn test_malformed_client_messages() {
        for line in [
            "",
            "hello",
            "move A 0",
            "move A 0 3",
            "move A -1 0",
            "move Z 0 0",
            "move A 0 0 0",
            "exit",
            "ready now",
            "name a b",
        ] {
            assert!(
                matches!(line.parse::<ClientMessage>(), Err(ProtocolError::Malformed { .. })),
                "{:?} should be malformed",
                line
            );
        }
    }

    #[test]
    fn test_server_message_wire_format() {
        let cases = [
            (ServerMessage::JoinedFirst, "joined-first"),
            (ServerMessage::JoinedSecond, "joined-second"),
            (ServerMessage::Assign { symbol: Symbol::B }, "assign B"),
            (ServerMessage::StartNewGame, "start-new-game"),
            (
                ServerMessage::GameOver {
                    result: GameResult::Draw,
                },
                "result draw",
            ),
            (
                ServerMessage::GameOver {
                    result: GameResult::Win(Symbol::A),
                },
                "result A",
            ),
            (
                ServerMessage::Rejected {
                    reason: RejectReason::NotYourTurn,
                },
                "rejected not-your-turn",
            ),
        ];

        for (msg, line) in cases {
            assert_eq!(msg.to_string(), line);
            assert_eq!(line.parse::<ServerMessage>().unwrap(), msg);
        }
    }

    #[test]
    fn test_move_relay_is_canonical() {
        let msg: ClientMessage = "move O 1 2".parse().unwrap();
        assert_eq!(msg.to_string(), "move B 1 2");
    }
}
