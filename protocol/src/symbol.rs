//! 棋子符号与格子坐标

use serde::{Deserialize, Serialize};

use crate::constants::BOARD_SIZE;

/// 玩家符号
///
/// 每个连接分配一个，分配后不再改变。线上格式为 `A`/`B`，解析时也接受 `X`/`O`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    /// 先手
    A,
    /// 后手
    B,
}

impl Symbol {
    /// 获取对手符号
    pub fn opponent(&self) -> Symbol {
        match self {
            Symbol::A => Symbol::B,
            Symbol::B => Symbol::A,
        }
    }

    /// 线上 token
    pub fn as_str(&self) -> &'static str {
        match self {
            Symbol::A => "A",
            Symbol::B => "B",
        }
    }

    /// 从 token 解析
    pub fn from_token(token: &str) -> Option<Symbol> {
        match token {
            "A" | "X" => Some(Symbol::A),
            "B" | "O" => Some(Symbol::B),
            _ => None,
        }
    }

    /// 棋盘上的显示字符
    pub fn display_char(&self) -> char {
        match self {
            Symbol::A => 'X',
            Symbol::B => 'O',
        }
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 格子坐标 (row, col)，取值 0..3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub row: u8,
    pub col: u8,
}

impl Cell {
    /// 创建坐标（带边界检查）
    pub fn new(row: u8, col: u8) -> Option<Self> {
        let cell = Self { row, col };
        if cell.is_valid() {
            Some(cell)
        } else {
            None
        }
    }

    /// 创建坐标（不检查边界）
    pub const fn new_unchecked(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// 检查坐标是否在棋盘内
    pub fn is_valid(&self) -> bool {
        (self.row as usize) < BOARD_SIZE && (self.col as usize) < BOARD_SIZE
    }

    /// 转换为一维索引
    pub fn to_index(&self) -> usize {
        self.row as usize * BOARD_SIZE + self.col as usize
    }

    /// 从一维索引创建
    pub fn from_index(index: usize) -> Option<Self> {
        if index < BOARD_SIZE * BOARD_SIZE {
            Some(Self::new_unchecked(
                (index / BOARD_SIZE) as u8,
                (index % BOARD_SIZE) as u8,
            ))
        } else {
            None
        }
    }

    /// 遍历全部 9 个格子（行优先）
    pub fn all() -> impl Iterator<Item = Cell> {
        (0..BOARD_SIZE * BOARD_SIZE).filter_map(Cell::from_index)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.row, self.col)
    }
}
