//! 网络连接管理
//!
//! 使用 protocol 库的传输层抽象

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use protocol::{
    Connector, LineReader, LineWriter, NetworkConfig, ProtocolError, ServerMessage, TcpConnector,
};

use crate::game::{ClientMachine, Intent, Reaction, SessionEnd};
use crate::view::GameView;

/// 连接到服务器并分离读写端
pub async fn connect(
    config: &NetworkConfig,
) -> Result<(LineReader<OwnedReadHalf>, LineWriter<OwnedWriteHalf>)> {
    let addr = config.addr();
    let conn = TcpConnector
        .connect(&addr)
        .await
        .with_context(|| format!("无法连接服务器: {}", addr))?;
    info!("Connected to server: {}", addr);
    Ok(conn.split())
}

/// 后台读任务：解析每一行并送入通道，连接关闭时丢弃发送端
fn spawn_reader<R>(
    mut reader: LineReader<R>,
) -> (mpsc::UnboundedReceiver<ServerMessage>, JoinHandle<()>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(async move {
        loop {
            match reader.recv::<ServerMessage>().await {
                Ok(msg) => {
                    debug!("Server -> {}", msg);
                    if tx.send(msg).is_err() {
                        break;
                    }
                }
                Err(ProtocolError::Malformed { line }) => {
                    debug!("Dropping malformed line from server: {:?}", line);
                }
                Err(e) if e.is_disconnect() => {
                    info!("Server closed the connection");
                    break;
                }
                Err(e) => {
                    warn!("Receive error: {}", e);
                    break;
                }
            }
        }
    });
    (rx, handle)
}

/// 运行一个客户端会话直到结束
///
/// 意图通道关闭视为请求退出。
pub async fn run_session<R, W, V>(
    reader: LineReader<R>,
    mut writer: LineWriter<W>,
    machine: &mut ClientMachine,
    view: &mut V,
    mut intents: mpsc::UnboundedReceiver<Intent>,
) -> Result<SessionEnd>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send,
    V: GameView + ?Sized,
{
    let (mut inbound, reader_task) = spawn_reader(reader);
    let mut intents_open = true;

    let end = loop {
        let reaction = tokio::select! {
            msg = inbound.recv() => match msg {
                Some(msg) => machine.on_message(&msg, view),
                None => {
                    view.notify_disconnected();
                    break SessionEnd::ServerClosed;
                }
            },
            intent = intents.recv(), if intents_open => match intent {
                Some(intent) => machine.on_intent(intent, view),
                None => {
                    intents_open = false;
                    machine.on_intent(Intent::RequestExit, view)
                }
            },
        };

        if let Some(end) = deliver(&mut writer, reaction, view).await? {
            break end;
        }
    };

    reader_task.abort();
    if let Err(e) = writer.shutdown().await {
        debug!("Shutdown after session end failed: {}", e);
    }
    info!("Session ended: {:?}", end);
    Ok(end)
}

/// 按顺序发送状态机给出的消息
async fn deliver<W, V>(
    writer: &mut LineWriter<W>,
    reaction: Reaction,
    view: &mut V,
) -> Result<Option<SessionEnd>>
where
    W: AsyncWrite + Unpin + Send,
    V: GameView + ?Sized,
{
    for msg in &reaction.outbound {
        match writer.send(msg).await {
            Ok(()) => debug!("Client -> {}", msg),
            Err(e) if e.is_disconnect() => {
                warn!("Server went away while sending {}: {}", msg, e);
                view.notify_disconnected();
                return Ok(Some(SessionEnd::ServerClosed));
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to send {}", msg));
            }
        }
    }
    Ok(reaction.end)
}
