//! 网络监听与连接处理
//!
//! 每个连接一个读任务和一个写任务；连接数由信号量限制。

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

use protocol::{ClientMessage, Listener, ProtocolError, ServerMessage, TcpConnection, TcpListener};

use crate::config::ServerConfig;
use crate::server::MessageHandler;
use crate::session::Session;

/// 井字棋服务器
pub struct GameServer {
    listener: TcpListener,
    session: Arc<Session>,
    limiter: Arc<Semaphore>,
}

impl GameServer {
    /// 按配置绑定监听地址
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let addr = config.network.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("无法绑定地址: {}", addr))?;

        Ok(Self {
            listener,
            session: Arc::new(Session::new(config.strict_turns)),
            limiter: Arc::new(Semaphore::new(config.max_connections.max(1))),
        })
    }

    /// 实际监听地址
    pub fn local_addr(&self) -> Option<String> {
        self.listener.local_addr()
    }

    /// 共享会话
    pub fn session(&self) -> Arc<Session> {
        Arc::clone(&self.session)
    }

    /// 接受连接直到出错退出
    pub async fn run(mut self) -> Result<()> {
        let mut accepted: u64 = 0;
        loop {
            let permit = Arc::clone(&self.limiter)
                .acquire_owned()
                .await
                .context("connection limiter closed")?;

            let (conn, addr) = match self.listener.accept_with_addr().await {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };
            accepted += 1;
            info!("Connected to client {} ({})", accepted, addr);

            let session = Arc::clone(&self.session);
            tokio::spawn(async move {
                serve_connection(conn, addr, session).await;
                drop(permit);
            });
        }
    }
}

/// 处理单个连接直到断开
pub async fn serve_connection(conn: TcpConnection, addr: String, session: Arc<Session>) {
    let (mut reader, mut writer) = conn.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let peer_id = session.registry().register(addr.clone(), tx);

    let writer_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = writer.write_line(&msg).await {
                warn!("Write to peer {} failed: {}", peer_id, e);
                break;
            }
        }
    });

    loop {
        match reader.recv::<ClientMessage>().await {
            Ok(msg) => {
                debug!("Peer {} -> {}", peer_id, msg);
                MessageHandler::handle(&session, peer_id, msg);
            }
            Err(ProtocolError::Malformed { line }) => {
                debug!("Dropping malformed line from peer {}: {:?}", peer_id, line);
            }
            Err(e) if e.is_disconnect() => {
                info!("Peer {} ({}) disconnected", peer_id, addr);
                break;
            }
            Err(e) => {
                warn!("Connection error on peer {} ({}): {}", peer_id, addr, e);
                break;
            }
        }
    }

    session.registry().leave(peer_id);
    if let Err(e) = writer_task.await {
        warn!("Writer task for peer {} panicked: {}", peer_id, e);
    }
}
