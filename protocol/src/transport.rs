//! 传输层抽象
//!
//! 提供 Connector/Connection/Listener traits 使上层协议与具体传输实现解耦。
//! 线上格式：一行一条命令，以 `\n` 结尾（兼容 `\r\n`），无长度前缀。

use std::fmt::Display;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::{ProtocolError, Result};
use crate::{CONNECT_TIMEOUT, DEFAULT_HOST, DEFAULT_PORT, MAX_LINE_LEN};

/// 网络配置
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub host: String,
    pub port: u16,
}

impl NetworkConfig {
    /// `host:port` 形式的地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// 连接抽象 trait（核心抽象，用于业务层）
#[async_trait]
pub trait Connection: Send + Sync {
    /// 发送一行消息
    async fn send<M: Display + Send + Sync>(&mut self, msg: &M) -> Result<()>;

    /// 接收并解析一行消息
    ///
    /// 解析失败返回 `ProtocolError::Malformed`，连接仍可继续使用。
    async fn recv<M: FromStr<Err = ProtocolError>>(&mut self) -> Result<M>;

    /// 关闭连接
    async fn close(&mut self) -> Result<()>;

    /// 获取远端地址
    fn peer_addr(&self) -> Option<String>;
}

/// 连接器 trait（客户端使用）
#[async_trait]
pub trait Connector: Send + Sync {
    type Conn: Connection;

    /// 建立连接
    async fn connect(&self, addr: &str) -> Result<Self::Conn>;
}

/// 监听器 trait（服务端使用）
#[async_trait]
pub trait Listener: Send + Sync + Sized {
    type Conn: Connection;

    /// 绑定地址
    async fn bind(addr: &str) -> Result<Self>;

    /// 接受连接
    async fn accept(&mut self) -> Result<Self::Conn>;

    /// 获取本地地址
    fn local_addr(&self) -> Option<String>;
}

// ============================================================================
// TCP 实现
// ============================================================================

/// TCP 连接器
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    type Conn = TcpConnection;

    async fn connect(&self, addr: &str) -> Result<Self::Conn> {
        let stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| ProtocolError::ConnectionTimeout)?
            .map_err(ProtocolError::Io)?;

        TcpConnection::from_stream(stream)
    }
}

/// TCP 连接
pub struct TcpConnection {
    reader: LineReader<OwnedReadHalf>,
    writer: LineWriter<OwnedWriteHalf>,
    peer_addr: Option<String>,
}

impl TcpConnection {
    /// 从 TcpStream 创建
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr().ok().map(|a| a.to_string());
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: LineReader::new(read_half),
            writer: LineWriter::new(write_half),
            peer_addr,
        })
    }

    /// 分离读写端
    pub fn split(self) -> (LineReader<OwnedReadHalf>, LineWriter<OwnedWriteHalf>) {
        (self.reader, self.writer)
    }
}

#[async_trait]
impl Connection for TcpConnection {
    async fn send<M: Display + Send + Sync>(&mut self, msg: &M) -> Result<()> {
        self.writer.write_line(msg).await
    }

    async fn recv<M: FromStr<Err = ProtocolError>>(&mut self) -> Result<M> {
        self.reader.recv().await
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.shutdown().await
    }

    fn peer_addr(&self) -> Option<String> {
        self.peer_addr.clone()
    }
}

/// TCP 监听器
pub struct TcpListener {
    listener: tokio::net::TcpListener,
}

impl TcpListener {
    /// 接受连接并返回远端地址
    pub async fn accept_with_addr(&mut self) -> Result<(TcpConnection, String)> {
        let (stream, addr) = self.listener.accept().await.map_err(ProtocolError::Io)?;
        Ok((TcpConnection::from_stream(stream)?, addr.to_string()))
    }
}

#[async_trait]
impl Listener for TcpListener {
    type Conn = TcpConnection;

    async fn bind(addr: &str) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(ProtocolError::Io)?;
        Ok(Self { listener })
    }

    async fn accept(&mut self) -> Result<Self::Conn> {
        let (stream, _addr) = self.listener.accept().await.map_err(ProtocolError::Io)?;
        TcpConnection::from_stream(stream)
    }

    fn local_addr(&self) -> Option<String> {
        self.listener.local_addr().ok().map(|a| a.to_string())
    }
}

// ============================================================================
// 行编解码
// ============================================================================

/// 行读取器
pub struct LineReader<R> {
    reader: BufReader<R>,
    buffer: Vec<u8>,
}

impl<R: AsyncRead + Unpin + Send> LineReader<R> {
    /// 创建新的行读取器
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buffer: Vec::with_capacity(MAX_LINE_LEN),
        }
    }

    /// 读取一行（不含行尾）
    ///
    /// 对端关闭且无残留数据时返回 `ConnectionClosed`；末行缺少换行符时照常返回。
    /// 取消安全：未读完的半行保留在内部缓冲区，下次调用继续拼接。
    pub async fn read_line(&mut self) -> Result<String> {
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                if self.buffer.is_empty() {
                    return Err(ProtocolError::ConnectionClosed);
                }
                break;
            }

            let newline = available.iter().position(|b| *b == b'\n');
            let chunk_len = newline.unwrap_or(available.len());
            if self.buffer.len() + chunk_len > MAX_LINE_LEN {
                let size = self.buffer.len() + chunk_len;
                self.buffer.clear();
                return Err(ProtocolError::LineTooLong {
                    size,
                    max: MAX_LINE_LEN,
                });
            }
            self.buffer.extend_from_slice(&available[..chunk_len]);

            match newline {
                Some(_) => {
                    self.reader.consume(chunk_len + 1);
                    break;
                }
                None => self.reader.consume(chunk_len),
            }
        }

        if self.buffer.last() == Some(&b'\r') {
            self.buffer.pop();
        }
        let line = std::mem::replace(&mut self.buffer, Vec::with_capacity(MAX_LINE_LEN));
        String::from_utf8(line).map_err(|_| ProtocolError::InvalidUtf8)
    }

    /// 读取并解析一行
    pub async fn recv<M: FromStr<Err = ProtocolError>>(&mut self) -> Result<M> {
        let line = self.read_line().await?;
        line.parse()
    }
}

/// 行写入器
pub struct LineWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> LineWriter<W> {
    /// 创建新的行写入器
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// 写入一行并刷新
    pub async fn write_line<M: Display + ?Sized>(&mut self, msg: &M) -> Result<()> {
        let mut line = msg.to_string();
        if line.len() > MAX_LINE_LEN {
            return Err(ProtocolError::LineTooLong {
                size: line.len(),
                max: MAX_LINE_LEN,
            });
        }
        line.push('\n');

        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// 发送消息（write_line 的别名）
    pub async fn send<M: Display + ?Sized>(&mut self, msg: &M) -> Result<()> {
        self.write_line(msg).await
    }

    /// 关闭写端
    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
