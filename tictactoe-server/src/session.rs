//! 对局会话
//!
//! 一个会话 = 一块棋盘 + 当前回合 + 连接注册表。棋盘和回合由同一把锁保护，
//! 落子、判定、回合切换在一次加锁内完成。

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use protocol::{Board, Cell, Outcome, RejectReason, ServerMessage, Symbol};

use crate::registry::{JoinOrdinal, PeerId, Registry};

/// 棋局状态
#[derive(Debug, Default)]
struct MatchState {
    board: Board,
    /// 当前应走的一方；`None` 表示没有进行中的对局
    turn: Option<Symbol>,
}

/// 落子处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// 已落子，附带落子后的局面评估
    Applied(Outcome),
    /// 目标格子已被占用，静默丢弃
    Occupied,
    /// 回合检查未通过
    Rejected(RejectReason),
}

/// 对局会话
#[derive(Debug)]
pub struct Session {
    state: Mutex<MatchState>,
    registry: Registry,
    /// 是否在服务端检查回合
    strict_turns: bool,
}

impl Session {
    pub fn new(strict_turns: bool) -> Self {
        Self {
            state: Mutex::new(MatchState::default()),
            registry: Registry::new(),
            strict_turns,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 连接注册表
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn strict_turns(&self) -> bool {
        self.strict_turns
    }

    /// 玩家加入：第一人加入时清空棋盘，第二人加入时开局（A 先手）
    ///
    /// 加入顺序的判定、棋盘/回合的更新以及握手回复的入队都在棋局锁内完成，
    /// 因此每个连接通道里的握手消息顺序与加入顺序一致。
    /// 锁顺序：棋局锁在外，注册表锁在内。
    pub fn join(&self, peer_id: PeerId) -> JoinOrdinal {
        let mut state = self.lock();
        let ordinal = self.registry.join(peer_id);
        match ordinal {
            JoinOrdinal::First => {
                state.board.reset();
                state.turn = None;
                self.registry.unicast(peer_id, ServerMessage::JoinedFirst);
            }
            JoinOrdinal::Second => {
                state.turn = Some(Symbol::A);
                self.registry.unicast(
                    peer_id,
                    ServerMessage::Assign {
                        symbol: ordinal.symbol(),
                    },
                );
                self.registry.broadcast(&ServerMessage::JoinedSecond);
            }
        }
        ordinal
    }

    /// 落子
    ///
    /// 回合检查、落子、判定在同一把锁内完成，锁释放时终局与否已确定。
    pub fn apply_move(&self, peer_id: PeerId, symbol: Symbol, cell: Cell) -> MoveOutcome {
        if self.strict_turns {
            match self.registry.symbol_of(peer_id) {
                None => return MoveOutcome::Rejected(RejectReason::NotJoined),
                Some(assigned) if assigned != symbol => {
                    return MoveOutcome::Rejected(RejectReason::WrongSymbol)
                }
                Some(_) => {}
            }
        }

        let mut state = self.lock();
        if self.strict_turns {
            match state.turn {
                None => return MoveOutcome::Rejected(RejectReason::NotInProgress),
                Some(turn) if turn != symbol => {
                    return MoveOutcome::Rejected(RejectReason::NotYourTurn)
                }
                Some(_) => {}
            }
        }

        if let Err(e) = state.board.apply_move(cell, symbol) {
            debug!("Dropping move from peer {}: {}", peer_id, e);
            return MoveOutcome::Occupied;
        }

        let outcome = state.board.evaluate();
        state.turn = if outcome.is_terminal() {
            None
        } else {
            Some(symbol.opponent())
        };
        MoveOutcome::Applied(outcome)
    }

    /// 处理 `ready`：清空棋盘并开局
    ///
    /// 严格模式下已有进行中的对局时忽略（双方都会发 `ready`），返回是否生效。
    pub fn start_new_game(&self) -> bool {
        let mut state = self.lock();
        if self.strict_turns && state.turn.is_some() {
            return false;
        }
        state.board.reset();
        state.turn = Some(Symbol::A);
        drop(state);

        self.registry.clear_restarts();
        true
    }

    /// 处理 `restart`：返回本轮计数
    pub fn record_restart(&self) -> u8 {
        let votes = self.registry.record_restart();
        if votes == 2 {
            info!("Both players asked for a rematch");
        }
        votes
    }

    /// 处理 `exit`：加入计数归零，结束当前对局
    pub fn abandon(&self) {
        let mut state = self.lock();
        self.registry.reset_joins();
        state.turn = None;
    }

    /// 棋盘快照
    pub fn board(&self) -> Board {
        self.lock().board.clone()
    }

    /// 当前回合
    pub fn turn(&self) -> Option<Symbol> {
        self.lock().turn
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn cell(row: u8, col: u8) -> Cell {
        Cell::new_unchecked(row, col)
    }

    /// 两人加入后的会话
    fn started(strict: bool) -> (Session, PeerId, PeerId) {
        let session = Session::new(strict);
        let (tx1, _) = mpsc::unbounded_channel();
        let (tx2, _) = mpsc::unbounded_channel();
        let p1 = session.registry().register("p1", tx1);
        let p2 = session.registry().register("p2", tx2);
        assert_eq!(session.join(p1), JoinOrdinal::First);
        assert_eq!(session.join(p2), JoinOrdinal::Second);
        (session, p1, p2)
    }

    #[test]
    fn test_turns_alternate() {
        let (session, p1, p2) = started(true);
        assert_eq!(session.turn(), Some(Symbol::A));

        assert_eq!(
            session.apply_move(p1, Symbol::A, cell(0, 0)),
            MoveOutcome::Applied(Outcome::Continue)
        );
        assert_eq!(session.turn(), Some(Symbol::B));
        assert_eq!(
            session.apply_move(p1, Symbol::A, cell(0, 1)),
            MoveOutcome::Rejected(RejectReason::NotYourTurn)
        );
        assert_eq!(
            session.apply_move(p2, Symbol::B, cell(1, 1)),
            MoveOutcome::Applied(Outcome::Continue)
        );
    }

    #[test]
    fn test_wrong_symbol_and_not_joined() {
        let (session, _p1, p2) = started(true);
        assert_eq!(
            session.apply_move(p2, Symbol::A, cell(0, 0)),
            MoveOutcome::Rejected(RejectReason::WrongSymbol)
        );

        let (tx, _) = mpsc::unbounded_channel();
        let stranger = session.registry().register("p3", tx);
        assert_eq!(
            session.apply_move(stranger, Symbol::A, cell(0, 0)),
            MoveOutcome::Rejected(RejectReason::NotJoined)
        );
        assert_eq!(session.board().occupied_count(), 0);
    }

    #[test]
    fn test_occupied_cell_keeps_value() {
        let (session, p1, p2) = started(true);
        session.apply_move(p1, Symbol::A, cell(1, 1));
        assert_eq!(
            session.apply_move(p2, Symbol::B, cell(1, 1)),
            MoveOutcome::Occupied
        );
        assert_eq!(session.board().get(cell(1, 1)), Some(Symbol::A));
        // 占用格子不消耗回合
        assert_eq!(session.turn(), Some(Symbol::B));
    }

    #[test]
    fn test_win_ends_game() {
        let (session, p1, p2) = started(true);
        session.apply_move(p1, Symbol::A, cell(0, 0));
        session.apply_move(p2, Symbol::B, cell(1, 0));
        session.apply_move(p1, Symbol::A, cell(0, 1));
        session.apply_move(p2, Symbol::B, cell(1, 1));
        assert_eq!(
            session.apply_move(p1, Symbol::A, cell(0, 2)),
            MoveOutcome::Applied(Outcome::Win(Symbol::A))
        );
        assert_eq!(session.turn(), None);
        assert_eq!(
            session.apply_move(p2, Symbol::B, cell(2, 2)),
            MoveOutcome::Rejected(RejectReason::NotInProgress)
        );
    }

    #[test]
    fn test_ready_once_per_round() {
        let (session, p1, _p2) = started(true);
        session.apply_move(p1, Symbol::A, cell(0, 0));

        // 对局进行中，ready 被忽略
        assert!(!session.start_new_game());
        assert_eq!(session.board().occupied_count(), 1);

        session.abandon();
        assert!(session.start_new_game());
        assert!(!session.start_new_game());
        assert_eq!(session.board().occupied_count(), 0);
        assert_eq!(session.turn(), Some(Symbol::A));
    }

    #[test]
    fn test_lenient_mode_skips_turn_checks() {
        let (session, p1, _p2) = started(false);
        assert_eq!(
            session.apply_move(p1, Symbol::A, cell(0, 0)),
            MoveOutcome::Applied(Outcome::Continue)
        );
        assert_eq!(
            session.apply_move(p1, Symbol::A, cell(0, 1)),
            MoveOutcome::Applied(Outcome::Continue)
        );
        assert_eq!(
            session.apply_move(p1, Symbol::A, cell(0, 2)),
            MoveOutcome::Applied(Outcome::Win(Symbol::A))
        );
        // 宽松模式下 ready 总是生效
        assert!(session.start_new_game());
        assert!(session.start_new_game());
    }

    #[test]
    fn test_concurrent_joins_start_the_game() {
        use std::sync::{Arc, Barrier};
        use std::thread;

        for _ in 0..200 {
            let session = Arc::new(Session::new(true));
            let (tx1, mut rx1) = mpsc::unbounded_channel();
            let (tx2, mut rx2) = mpsc::unbounded_channel();
            let p1 = session.registry().register("p1", tx1);
            let p2 = session.registry().register("p2", tx2);

            let barrier = Arc::new(Barrier::new(2));
            let handles: Vec<_> = [p1, p2]
                .into_iter()
                .map(|peer| {
                    let session = Arc::clone(&session);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        session.join(peer)
                    })
                })
                .collect();
            let ordinals: Vec<JoinOrdinal> =
                handles.into_iter().map(|h| h.join().unwrap()).collect();

            assert!(ordinals.contains(&JoinOrdinal::First));
            assert!(ordinals.contains(&JoinOrdinal::Second));
            // 第一人加入的重置不能覆盖第二人开局
            assert_eq!(session.turn(), Some(Symbol::A));

            let (first_rx, second_rx) = if ordinals[0] == JoinOrdinal::First {
                (&mut rx1, &mut rx2)
            } else {
                (&mut rx2, &mut rx1)
            };
            assert_eq!(first_rx.try_recv().unwrap(), ServerMessage::JoinedFirst);
            assert_eq!(first_rx.try_recv().unwrap(), ServerMessage::JoinedSecond);
            assert_eq!(
                second_rx.try_recv().unwrap(),
                ServerMessage::Assign { symbol: Symbol::B }
            );
            assert_eq!(second_rx.try_recv().unwrap(), ServerMessage::JoinedSecond);
        }
    }

    #[test]
    fn test_first_join_resets_board() {
        let (session, p1, _p2) = started(true);
        session.apply_move(p1, Symbol::A, cell(0, 0));
        session.abandon();

        assert_eq!(session.join(p1), JoinOrdinal::First);
        assert_eq!(session.board().occupied_count(), 0);
        assert_eq!(session.turn(), None);
    }
}
