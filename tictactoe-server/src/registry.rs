//! 连接注册表
//!
//! 保存当前会话的所有连接及其发送通道，负责广播/单播。
//! 连接集合、加入计数和再来一局计数由同一把锁保护。

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use protocol::{ServerMessage, Symbol};

/// 连接 ID
pub type PeerId = u64;

/// 发送给单个连接的消息通道
pub type PeerSender = mpsc::UnboundedSender<ServerMessage>;

/// 加入顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOrdinal {
    First,
    Second,
}

impl JoinOrdinal {
    /// 该顺序对应的符号
    pub fn symbol(self) -> Symbol {
        match self {
            JoinOrdinal::First => Symbol::A,
            JoinOrdinal::Second => Symbol::B,
        }
    }
}

/// 已注册的连接
#[derive(Debug)]
struct Peer {
    id: PeerId,
    addr: String,
    symbol: Option<Symbol>,
    tx: PeerSender,
}

#[derive(Debug, Default)]
struct RegistryInner {
    peers: Vec<Peer>,
    /// 本轮已加入人数（0/1，第二人加入后归零）
    join_count: u8,
    /// 本轮 restart 计数（0/1，满 2 归零）
    restart_votes: u8,
    next_id: PeerId,
}

/// 连接注册表
#[derive(Debug, Default)]
pub struct Registry {
    inner: Mutex<RegistryInner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 注册新连接，返回其 ID
    pub fn register(&self, addr: impl Into<String>, tx: PeerSender) -> PeerId {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.peers.push(Peer {
            id,
            addr: addr.into(),
            symbol: None,
            tx,
        });
        id
    }

    /// 处理一次 `name`：返回加入顺序并记录该连接的符号
    pub fn join(&self, peer_id: PeerId) -> JoinOrdinal {
        let mut inner = self.lock();
        let ordinal = if inner.join_count == 0 {
            inner.join_count = 1;
            JoinOrdinal::First
        } else {
            inner.join_count = 0;
            JoinOrdinal::Second
        };

        if let Some(peer) = inner.peers.iter_mut().find(|p| p.id == peer_id) {
            peer.symbol = Some(ordinal.symbol());
        }
        ordinal
    }

    /// 加入计数归零
    pub fn reset_joins(&self) {
        self.lock().join_count = 0;
    }

    /// 记录一次 restart，返回本轮计数（1 或 2）；到 2 后内部归零
    pub fn record_restart(&self) -> u8 {
        let mut inner = self.lock();
        let votes = inner.restart_votes + 1;
        inner.restart_votes = if votes >= 2 { 0 } else { votes };
        votes
    }

    /// restart 计数归零
    pub fn clear_restarts(&self) {
        self.lock().restart_votes = 0;
    }

    /// 当前 restart 计数
    #[cfg(test)]
    fn restart_votes(&self) -> u8 {
        self.lock().restart_votes
    }

    /// 获取连接分配到的符号
    pub fn symbol_of(&self, peer_id: PeerId) -> Option<Symbol> {
        self.lock()
            .peers
            .iter()
            .find(|p| p.id == peer_id)
            .and_then(|p| p.symbol)
    }

    /// 获取连接的远端地址
    pub fn addr_of(&self, peer_id: PeerId) -> Option<String> {
        self.lock()
            .peers
            .iter()
            .find(|p| p.id == peer_id)
            .map(|p| p.addr.clone())
    }

    /// 发送给单个连接
    pub fn unicast(&self, peer_id: PeerId, msg: ServerMessage) -> bool {
        let tx = self
            .lock()
            .peers
            .iter()
            .find(|p| p.id == peer_id)
            .map(|p| p.tx.clone());

        match tx {
            Some(tx) => match tx.send(msg) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to deliver {} to peer {}: channel closed", e.0, peer_id);
                    false
                }
            },
            None => {
                debug!("Unicast to unknown peer {} dropped", peer_id);
                false
            }
        }
    }

    /// 广播给调用时已注册的全部连接，返回成功投递数
    ///
    /// 先在锁内拍快照，锁外逐个发送；单个连接失败只记录日志。
    pub fn broadcast(&self, msg: &ServerMessage) -> usize {
        let snapshot: Vec<(PeerId, PeerSender)> = self
            .lock()
            .peers
            .iter()
            .map(|p| (p.id, p.tx.clone()))
            .collect();

        let mut delivered = 0;
        for (peer_id, tx) in snapshot {
            match tx.send(msg.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => warn!("Failed to deliver {} to peer {}: channel closed", msg, peer_id),
            }
        }
        delivered
    }

    /// 移除连接（幂等）
    pub fn leave(&self, peer_id: PeerId) -> bool {
        let mut inner = self.lock();
        let before = inner.peers.len();
        inner.peers.retain(|p| p.id != peer_id);
        inner.peers.len() != before
    }

    /// 当前连接数
    pub fn len(&self) -> usize {
        self.lock().peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
