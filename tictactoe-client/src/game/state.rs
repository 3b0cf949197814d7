//! 客户端协议状态机
//!
//! 按顺序消费服务端消息与用户意图，更新本地状态、驱动界面，
//! 并给出需要发往服务端的消息。本模块不做任何 I/O。

use protocol::{Board, Cell, ClientMessage, GameResult, RejectReason, ServerMessage, Symbol};
use tracing::{debug, info};

use super::Intent;
use crate::view::GameView;

/// 客户端所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// 尚未获得身份
    #[default]
    Unidentified,
    /// 已获得身份，等待对手
    Identified,
    /// 轮到己方
    MyTurn,
    /// 轮到对手
    OpponentTurn,
    /// 对局结束，等待选择
    GameOver,
    /// 已请求再来一局，等待对手
    RestartPending,
    /// 已退出（终态）
    Exited,
}

/// 会话结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// 己方退出
    Exited,
    /// 对手离开
    OpponentLeft,
    /// 服务器断开
    ServerClosed,
}

/// 一次状态转移的结果
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Reaction {
    /// 需要按顺序发往服务端的消息
    pub outbound: Vec<ClientMessage>,
    /// 会话是否就此结束
    pub end: Option<SessionEnd>,
}

impl Reaction {
    fn none() -> Self {
        Self::default()
    }

    fn send(msg: ClientMessage) -> Self {
        Self {
            outbound: vec![msg],
            end: None,
        }
    }

    fn end(end: SessionEnd) -> Self {
        Self {
            outbound: Vec::new(),
            end: Some(end),
        }
    }
}

/// 比分
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scoreboard {
    pub a_wins: u32,
    pub b_wins: u32,
    pub draws: u32,
}

impl Scoreboard {
    /// 记录一局结果
    pub fn record(&mut self, result: GameResult) {
        match result {
            GameResult::Win(Symbol::A) => self.a_wins += 1,
            GameResult::Win(Symbol::B) => self.b_wins += 1,
            GameResult::Draw => self.draws += 1,
        }
    }

    /// 总局数
    pub fn total(&self) -> u32 {
        self.a_wins + self.b_wins + self.draws
    }
}

/// 客户端状态机
#[derive(Debug, Default)]
pub struct ClientMachine {
    symbol: Option<Symbol>,
    is_my_turn: bool,
    restart_votes: u8,
    phase: Phase,
    /// 本地镜像棋盘
    board: Board,
    /// 已发出落子、尚未收到转发或拒绝
    move_in_flight: bool,
    name_submitted: bool,
    /// 身份由 `joined-second` 推断而来，尚未得到服务端确认
    symbol_inferred: bool,
    /// 等待玩家回答的对局结果
    pending_result: Option<GameResult>,
    scoreboard: Scoreboard,
}

impl ClientMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symbol(&self) -> Option<Symbol> {
        self.symbol
    }

    pub fn is_my_turn(&self) -> bool {
        self.is_my_turn
    }

    pub fn restart_votes(&self) -> u8 {
        self.restart_votes
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn scoreboard(&self) -> Scoreboard {
        self.scoreboard
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// 处理一条服务端消息
    pub fn on_message<V: GameView + ?Sized>(
        &mut self,
        msg: &ServerMessage,
        view: &mut V,
    ) -> Reaction {
        if self.phase == Phase::Exited {
            debug!("Ignoring {} after exit", msg);
            return Reaction::none();
        }

        match msg {
            ServerMessage::JoinedFirst => self.on_joined_first(view),
            ServerMessage::Assign { symbol } => self.on_assign(*symbol, view),
            ServerMessage::JoinedSecond => self.on_joined_second(view),
            _ if self.symbol.is_none() => {
                debug!("Ignoring {} before identity is assigned", msg);
                Reaction::none()
            }
            ServerMessage::Move { symbol, cell } => self.on_move(*symbol, *cell, view),
            ServerMessage::Exit { symbol } => self.on_exit(*symbol, view),
            ServerMessage::Restart { .. } => self.on_restart(view),
            ServerMessage::StartNewGame => self.on_start_new_game(view),
            ServerMessage::GameOver { result } => self.on_game_over(*result, view),
            ServerMessage::Rejected { reason } => self.on_rejected(*reason, view),
        }
    }

    /// 处理一个用户意图
    pub fn on_intent<V: GameView + ?Sized>(&mut self, intent: Intent, view: &mut V) -> Reaction {
        if self.phase == Phase::Exited {
            return Reaction::none();
        }

        match intent {
            Intent::SubmitName { nickname } => {
                if self.name_submitted {
                    debug!("Name already submitted");
                    return Reaction::none();
                }
                self.name_submitted = true;
                view.set_title_message("Joining the game...");
                Reaction::send(ClientMessage::Name { nickname })
            }
            Intent::CellClick(cell) => self.on_cell_click(cell),
            Intent::PlayAgain(answer) => {
                if self.phase != Phase::GameOver || self.pending_result.is_none() {
                    debug!("No pending play-again question");
                    return Reaction::none();
                }
                self.decide_play_again(answer, view)
            }
            Intent::RequestExit => match self.symbol {
                Some(me) => {
                    view.set_input_enabled(false);
                    Reaction::send(ClientMessage::Exit { symbol: me })
                }
                // 没有身份时服务端不会转发退出消息，直接结束
                None => {
                    self.phase = Phase::Exited;
                    Reaction::end(SessionEnd::Exited)
                }
            },
        }
    }

    fn on_joined_first<V: GameView + ?Sized>(&mut self, view: &mut V) -> Reaction {
        // 推断出的 B 其实来自对手的加入广播，对手已在场
        let opponent_present = self.symbol_inferred;

        // 新身份意味着新的一轮
        self.board.reset();
        self.restart_votes = 0;
        self.move_in_flight = false;
        self.pending_result = None;
        self.is_my_turn = false;
        self.assign(Symbol::A, view);

        if opponent_present {
            view.reset_board_view();
            view.set_input_enabled(true);
            self.set_turn(true, view);
            view.set_title_message("Your opponent has joined, now is your turn.");
        } else {
            view.set_title_message("Waiting for an opponent to join.");
        }
        Reaction::none()
    }

    fn on_assign<V: GameView + ?Sized>(&mut self, symbol: Symbol, view: &mut V) -> Reaction {
        self.assign(symbol, view);
        Reaction::none()
    }

    fn assign<V: GameView + ?Sized>(&mut self, symbol: Symbol, view: &mut V) {
        info!("Assigned symbol {}", symbol);
        self.symbol = Some(symbol);
        self.symbol_inferred = false;
        self.phase = Phase::Identified;
        view.set_identity(symbol);
    }

    fn on_joined_second<V: GameView + ?Sized>(&mut self, view: &mut V) -> Reaction {
        let me = match self.symbol {
            Some(me) => me,
            // 服务端未单播 assign 时，由广播推断出自己是后手
            None if self.name_submitted => {
                self.assign(Symbol::B, view);
                self.symbol_inferred = true;
                Symbol::B
            }
            None => {
                debug!("Ignoring joined-second for a connection that never joined");
                return Reaction::none();
            }
        };

        self.board.reset();
        self.move_in_flight = false;
        view.reset_board_view();
        view.set_input_enabled(true);
        self.set_turn(me == Symbol::A, view);
        if self.is_my_turn {
            view.set_title_message("Your opponent has joined, now is your turn.");
        } else {
            view.set_title_message("Wait for your opponent to move.");
        }
        Reaction::none()
    }

    fn on_move<V: GameView + ?Sized>(
        &mut self,
        mover: Symbol,
        cell: Cell,
        view: &mut V,
    ) -> Reaction {
        let me = self.me();
        if let Err(e) = self.board.apply_move(cell, mover) {
            debug!("Local board out of sync: {}", e);
        }
        view.render(cell, mover);

        if mover == me {
            self.move_in_flight = false;
        }
        self.set_turn(mover.opponent() == me, view);
        if mover == me {
            view.set_title_message("Valid move, wait for your opponent.");
        } else {
            view.set_title_message("Your opponent has moved, now is your turn.");
        }
        Reaction::none()
    }

    fn on_exit<V: GameView + ?Sized>(&mut self, leaver: Symbol, view: &mut V) -> Reaction {
        view.set_input_enabled(false);
        self.is_my_turn = false;
        self.phase = Phase::Exited;

        if leaver == self.me() {
            info!("Left the game");
            Reaction::end(SessionEnd::Exited)
        } else {
            info!("Opponent {} left the game", leaver);
            view.notify_opponent_left();
            Reaction::end(SessionEnd::OpponentLeft)
        }
    }

    fn on_restart<V: GameView + ?Sized>(&mut self, view: &mut V) -> Reaction {
        self.restart_votes += 1;
        if self.restart_votes < 2 {
            view.set_title_message("Wait for your opponent to continue.");
            return Reaction::none();
        }

        // 双方都已同意
        self.restart_votes = 0;
        Reaction::send(ClientMessage::Ready)
    }

    fn on_start_new_game<V: GameView + ?Sized>(&mut self, view: &mut V) -> Reaction {
        let me = self.me();
        self.board.reset();
        self.restart_votes = 0;
        self.move_in_flight = false;
        self.pending_result = None;
        view.reset_board_view();
        view.set_input_enabled(true);
        self.set_turn(me == Symbol::A, view);
        if self.is_my_turn {
            view.set_title_message("New game started, now is your turn.");
        } else {
            view.set_title_message("New game started, wait for your opponent to move.");
        }
        Reaction::none()
    }

    fn on_game_over<V: GameView + ?Sized>(&mut self, result: GameResult, view: &mut V) -> Reaction {
        let me = self.me();
        info!("Game over: {}", result);
        self.is_my_turn = false;
        self.move_in_flight = false;
        self.phase = Phase::GameOver;
        self.pending_result = Some(result);
        view.render_turn_state(false);
        view.set_input_enabled(false);
        view.set_title_message(match result.winner() {
            Some(winner) if winner == me => "You win!",
            Some(_) => "You lose!",
            None => "It's a draw!",
        });

        match view.prompt_play_again(result) {
            Some(answer) => self.decide_play_again(answer, view),
            None => Reaction::none(),
        }
    }

    fn decide_play_again<V: GameView + ?Sized>(&mut self, answer: bool, view: &mut V) -> Reaction {
        let me = self.me();
        let Some(result) = self.pending_result.take() else {
            return Reaction::none();
        };

        if !answer {
            view.set_input_enabled(false);
            return Reaction::send(ClientMessage::Exit { symbol: me });
        }

        self.phase = Phase::RestartPending;
        self.board.reset();
        self.scoreboard.record(result);
        view.reset_board_view();
        view.set_input_enabled(true);
        view.increment_score(result, &self.scoreboard);
        Reaction::send(ClientMessage::Restart { symbol: me })
    }

    fn on_rejected<V: GameView + ?Sized>(&mut self, reason: RejectReason, view: &mut V) -> Reaction {
        debug!("Move rejected: {}", reason);
        self.move_in_flight = false;
        view.set_title_message(match reason {
            RejectReason::NotYourTurn => "Move rejected: it is not your turn.",
            RejectReason::NotInProgress => "Move rejected: no game in progress.",
            RejectReason::WrongSymbol => "Move rejected: that is not your symbol.",
            RejectReason::NotJoined => "Move rejected: you have not joined.",
        });
        Reaction::none()
    }

    fn on_cell_click(&mut self, cell: Cell) -> Reaction {
        let Some(me) = self.symbol else {
            return Reaction::none();
        };
        // 回合合法性只在此处检查
        if !self.is_my_turn || self.move_in_flight {
            debug!("Click on {} ignored, not your turn", cell);
            return Reaction::none();
        }
        if !self.board.is_empty_at(cell) {
            debug!("Click on {} ignored, cell occupied", cell);
            return Reaction::none();
        }

        self.move_in_flight = true;
        Reaction::send(ClientMessage::Move { symbol: me, cell })
    }

    fn set_turn<V: GameView + ?Sized>(&mut self, is_my_turn: bool, view: &mut V) {
        self.is_my_turn = is_my_turn;
        self.phase = if is_my_turn {
            Phase::MyTurn
        } else {
            Phase::OpponentTurn
        };
        view.render_turn_state(is_my_turn);
    }

    /// 只在已确认有身份后调用
    fn me(&self) -> Symbol {
        self.symbol.unwrap_or(Symbol::A)
    }
}
