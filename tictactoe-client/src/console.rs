//! 终端界面
//!
//! 把状态机的界面调用打印为文本，并从标准输入读取用户意图。

use std::io::{self, BufRead, Write};
use std::thread;

use protocol::{Board, Cell, GameResult, Symbol};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::game::{parse_intent, Intent, Scoreboard};
use crate::view::GameView;

/// 终端界面
pub struct ConsoleView<W: Write> {
    out: W,
    board: Board,
    identity: Option<Symbol>,
    input_enabled: bool,
}

impl ConsoleView<io::Stdout> {
    /// 输出到标准输出
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            board: Board::new(),
            identity: None,
            input_enabled: false,
        }
    }

    /// 取回输出端
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text).and_then(|_| self.out.flush()) {
            warn!("Console write failed: {}", e);
        }
    }

    fn draw_board(&mut self) {
        let mut text = String::from("    0 1 2\n");
        for row in 0..3u8 {
            text.push_str(&format!("  {}", row));
            for col in 0..3u8 {
                let c = self
                    .board
                    .get(Cell::new_unchecked(row, col))
                    .map(|s| s.display_char())
                    .unwrap_or('.');
                text.push(' ');
                text.push(c);
            }
            if row < 2 {
                text.push('\n');
            }
        }
        self.line(&text);
    }
}

impl<W: Write> GameView for ConsoleView<W> {
    fn render(&mut self, cell: Cell, symbol: Symbol) {
        if let Err(e) = self.board.apply_move(cell, symbol) {
            debug!("Console board already has {}: {}", cell, e);
        }
        self.draw_board();
    }

    fn render_turn_state(&mut self, is_my_turn: bool) {
        let Some(me) = self.identity else {
            return;
        };
        if is_my_turn && self.input_enabled {
            self.line(&format!("Player {}: enter <row> <col> to place your mark.", me));
        }
    }

    fn set_title_message(&mut self, text: &str) {
        self.line(&format!("== {} ==", text));
    }

    fn set_identity(&mut self, symbol: Symbol) {
        self.identity = Some(symbol);
        self.line(&format!("You are player {} ({}).", symbol, symbol.display_char()));
    }

    fn reset_board_view(&mut self) {
        self.board.reset();
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.input_enabled = enabled;
    }

    fn increment_score(&mut self, _result: GameResult, tally: &Scoreboard) {
        self.line(&format!(
            "Score  A: {}  B: {}  draws: {}",
            tally.a_wins, tally.b_wins, tally.draws
        ));
    }

    fn prompt_play_again(&mut self, _result: GameResult) -> Option<bool> {
        // 答案由标准输入线程以 Intent::PlayAgain 送回
        self.line("Play again? (y/n)");
        None
    }

    fn notify_opponent_left(&mut self) {
        self.line("Your opponent has left the game.");
    }

    fn notify_disconnected(&mut self) {
        self.line("Disconnected from server.");
    }
}

/// 启动标准输入读取线程
///
/// 每行解析为一个意图送入通道；标准输入关闭或接收端丢弃时线程结束，
/// 发送端随之丢弃。
pub fn spawn_stdin_intents(tx: mpsc::UnboundedSender<Intent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            };
            match parse_intent(&line) {
                Some(intent) => {
                    if tx.send(intent).is_err() {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => println!("Unrecognized input: {:?}", line.trim()),
            }
        }
    })
}
