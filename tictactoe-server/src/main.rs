use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tictactoe_server::{GameServer, ServerConfig};

/// 井字棋对战服务端
#[derive(Parser, Debug)]
#[command(name = "tictactoe-server")]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 <config_dir>/tictactoe/server.json）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 监听地址
    #[arg(long)]
    host: Option<String>,

    /// 监听端口
    #[arg(short, long)]
    port: Option<u16>,

    /// 最大连接数
    #[arg(long)]
    max_connections: Option<usize>,

    /// 关闭服务端回合检查
    #[arg(long)]
    lenient: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("tictactoe_server=debug".parse()?))
        .init();

    let cli = Cli::parse();
    let mut config = ServerConfig::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.network.host = host;
    }
    if let Some(port) = cli.port {
        config.network.port = port;
    }
    if let Some(max_connections) = cli.max_connections {
        config.max_connections = max_connections;
    }
    if cli.lenient {
        config.strict_turns = false;
    }

    let server = GameServer::bind(&config).await?;
    info!(
        "Server is running on {} (strict turns: {})",
        server.local_addr().unwrap_or_else(|| config.network.addr()),
        server.session().strict_turns()
    );

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {}
    }

    info!("Server stopped");
    Ok(())
}
