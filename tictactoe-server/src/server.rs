//! 服务器主逻辑：命令分发

use tracing::{debug, info};

use protocol::{ClientMessage, ServerMessage};

use crate::registry::PeerId;
use crate::session::{MoveOutcome, Session};

/// 投递目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Peer(PeerId),
    All,
}

/// 待发送的消息（按产生顺序投递）
#[derive(Debug, Default)]
pub struct Outbox {
    deliveries: Vec<(Target, ServerMessage)>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn send(&mut self, peer_id: PeerId, msg: ServerMessage) {
        self.deliveries.push((Target::Peer(peer_id), msg));
    }

    fn broadcast(&mut self, msg: ServerMessage) {
        self.deliveries.push((Target::All, msg));
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }

    /// 按顺序投递
    pub fn flush(self, session: &Session) {
        let registry = session.registry();
        for (target, msg) in self.deliveries {
            match target {
                Target::Peer(peer_id) => {
                    registry.unicast(peer_id, msg);
                }
                Target::All => {
                    registry.broadcast(&msg);
                }
            }
        }
    }
}

/// 消息处理器
pub struct MessageHandler;

impl MessageHandler {
    /// 处理客户端消息并投递产生的回复
    pub fn handle(session: &Session, peer_id: PeerId, msg: ClientMessage) {
        let outbox = Self::dispatch(session, peer_id, msg);
        outbox.flush(session);
    }

    /// 处理客户端消息，返回待投递的回复
    ///
    /// 会话状态在返回前已经更新完毕。
    pub fn dispatch(session: &Session, peer_id: PeerId, msg: ClientMessage) -> Outbox {
        let mut outbox = Outbox::new();

        match msg {
            ClientMessage::Name { nickname } => Self::handle_name(session, peer_id, nickname),
            ClientMessage::Move { symbol, cell } => match session.apply_move(peer_id, symbol, cell) {
                MoveOutcome::Applied(outcome) => {
                    outbox.broadcast(ServerMessage::Move { symbol, cell });
                    if let Some(result) = outcome.result() {
                        info!("Game over: {}", result);
                        outbox.broadcast(ServerMessage::GameOver { result });
                    }
                }
                MoveOutcome::Occupied => {}
                MoveOutcome::Rejected(reason) => {
                    debug!("Rejected move {} {} from peer {}: {}", symbol, cell, peer_id, reason);
                    outbox.send(peer_id, ServerMessage::Rejected { reason });
                }
            },
            ClientMessage::Exit { symbol } => {
                info!("Player {} left the game", symbol);
                session.abandon();
                outbox.broadcast(ServerMessage::Exit { symbol });
            }
            ClientMessage::Restart { symbol } => {
                let votes = session.record_restart();
                debug!("Player {} asked for a rematch ({}/2)", symbol, votes);
                outbox.broadcast(ServerMessage::Restart { symbol });
            }
            ClientMessage::Ready => {
                if session.start_new_game() {
                    info!("New game started");
                    outbox.broadcast(ServerMessage::StartNewGame);
                } else {
                    debug!("Ignoring duplicate ready from peer {}", peer_id);
                }
            }
        }

        outbox
    }

    /// 处理加入
    ///
    /// 握手回复由 [`Session::join`] 在锁内直接入队，不经过 outbox。
    fn handle_name(session: &Session, peer_id: PeerId, nickname: Option<String>) {
        let ordinal = session.join(peer_id);
        info!(
            "Peer {} ({}) from {} joined as {:?}",
            peer_id,
            nickname.as_deref().unwrap_or("anonymous"),
            session.registry().addr_of(peer_id).unwrap_or_default(),
            ordinal
        );
    }
}
