//! 棋盘状态与胜负判定

use serde::{Deserialize, Serialize};

use crate::constants::CELL_COUNT;
use crate::error::GameError;
use crate::symbol::{Cell, Symbol};

/// 8 条连线：3 行、3 列、2 条对角线（判定按此顺序扫描）
const LINES: [[Cell; 3]; 8] = [
    [Cell::new_unchecked(0, 0), Cell::new_unchecked(0, 1), Cell::new_unchecked(0, 2)],
    [Cell::new_unchecked(1, 0), Cell::new_unchecked(1, 1), Cell::new_unchecked(1, 2)],
    [Cell::new_unchecked(2, 0), Cell::new_unchecked(2, 1), Cell::new_unchecked(2, 2)],
    [Cell::new_unchecked(0, 0), Cell::new_unchecked(1, 0), Cell::new_unchecked(2, 0)],
    [Cell::new_unchecked(0, 1), Cell::new_unchecked(1, 1), Cell::new_unchecked(2, 1)],
    [Cell::new_unchecked(0, 2), Cell::new_unchecked(1, 2), Cell::new_unchecked(2, 2)],
    [Cell::new_unchecked(0, 0), Cell::new_unchecked(1, 1), Cell::new_unchecked(2, 2)],
    [Cell::new_unchecked(0, 2), Cell::new_unchecked(1, 1), Cell::new_unchecked(2, 0)],
];

/// 对局结果（胜或和）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameResult {
    /// 某方三连
    Win(Symbol),
    /// 棋盘下满且无人三连
    Draw,
}

impl GameResult {
    /// 线上 token（`A`/`B`/`draw`）
    pub fn as_str(&self) -> &'static str {
        match self {
            GameResult::Win(symbol) => symbol.as_str(),
            GameResult::Draw => "draw",
        }
    }

    /// 从 token 解析
    pub fn from_token(token: &str) -> Option<GameResult> {
        if token.eq_ignore_ascii_case("draw") {
            return Some(GameResult::Draw);
        }
        Symbol::from_token(token).map(GameResult::Win)
    }

    /// 胜方
    pub fn winner(&self) -> Option<Symbol> {
        match self {
            GameResult::Win(symbol) => Some(*symbol),
            GameResult::Draw => None,
        }
    }
}

impl std::fmt::Display for GameResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 局面评估结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 对局继续
    Continue,
    /// 某方获胜
    Win(Symbol),
    /// 和棋
    Draw,
}

impl Outcome {
    /// 终局时转换为对局结果
    pub fn result(self) -> Option<GameResult> {
        match self {
            Outcome::Continue => None,
            Outcome::Win(symbol) => Some(GameResult::Win(symbol)),
            Outcome::Draw => Some(GameResult::Draw),
        }
    }

    /// 是否终局
    pub fn is_terminal(self) -> bool {
        !matches!(self, Outcome::Continue)
    }
}

/// 3x3 棋盘
///
/// 格子一旦落子，只有 [`Board::reset`] 能清空。本类型不做回合检查，
/// 并发访问由持有者加锁串行化。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cells: [Option<Symbol>; CELL_COUNT],
}

impl Board {
    /// 创建空棋盘
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指定格子的符号
    pub fn get(&self, cell: Cell) -> Option<Symbol> {
        if cell.is_valid() {
            self.cells[cell.to_index()]
        } else {
            None
        }
    }

    /// 格子是否为空
    pub fn is_empty_at(&self, cell: Cell) -> bool {
        cell.is_valid() && self.cells[cell.to_index()].is_none()
    }

    /// 落子
    ///
    /// 越界或格子已被占用时返回 `InvalidMove`，原有内容保持不变。
    pub fn apply_move(&mut self, cell: Cell, symbol: Symbol) -> Result<(), GameError> {
        if !cell.is_valid() {
            return Err(GameError::InvalidPosition {
                row: cell.row,
                col: cell.col,
            });
        }
        let slot = &mut self.cells[cell.to_index()];
        if slot.is_some() {
            return Err(GameError::InvalidMove {
                row: cell.row,
                col: cell.col,
            });
        }
        *slot = Some(symbol);
        Ok(())
    }

    /// 评估局面：先行、再列、最后两条对角线，首个三连即胜；否则满盘为和
    pub fn evaluate(&self) -> Outcome {
        for line in &LINES {
            let [a, b, c] = *line;
            let (a, b, c) = (
                self.cells[a.to_index()],
                self.cells[b.to_index()],
                self.cells[c.to_index()],
            );
            if let Some(symbol) = a {
                if a == b && b == c {
                    return Outcome::Win(symbol);
                }
            }
        }

        if self.is_full() {
            Outcome::Draw
        } else {
            Outcome::Continue
        }
    }

    /// 棋盘是否已下满
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// 已落子数
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// 清空棋盘（幂等）
    pub fn reset(&mut self) {
        self.cells = [None; CELL_COUNT];
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, cell) in self.cells.iter().enumerate() {
            let c = cell.map(|s| s.display_char()).unwrap_or('.');
            write!(f, "{}", c)?;
            if index % 3 == 2 && index + 1 < CELL_COUNT {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
