use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tictactoe_client::{
    connect, run_session, spawn_stdin_intents, ClientConfig, ClientMachine, ConsoleView, Intent,
    SessionEnd,
};

/// 井字棋终端客户端
#[derive(Parser, Debug)]
#[command(name = "tictactoe-client")]
#[command(version)]
struct Cli {
    /// 设置文件路径（默认 <config_dir>/tictactoe/client.json）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 服务器地址
    #[arg(long)]
    host: Option<String>,

    /// 服务器端口
    #[arg(short, long)]
    port: Option<u16>,

    /// 昵称
    #[arg(short, long)]
    nickname: Option<String>,

    /// 连接后不自动加入，等待输入 `name`
    #[arg(long)]
    manual_join: bool,

    /// 把本次的有效设置保存到默认位置
    #[arg(long)]
    save_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 日志写到 stderr，避免与棋盘输出混在一起
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("tictactoe_client=info".parse()?))
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.network.host = host;
    }
    if let Some(port) = cli.port {
        config.network.port = port;
    }
    if cli.nickname.is_some() {
        config.nickname = cli.nickname;
    }
    if cli.manual_join {
        config.auto_join = false;
    }
    if cli.save_config {
        config.save()?;
    }

    let (reader, writer) = connect(&config.network).await?;

    let (intent_tx, intent_rx) = mpsc::unbounded_channel();
    if config.auto_join {
        intent_tx.send(Intent::SubmitName {
            nickname: config.nickname.clone(),
        })?;
    } else {
        println!("Type `name` to join the game.");
    }
    spawn_stdin_intents(intent_tx);

    let mut machine = ClientMachine::new();
    let mut view = ConsoleView::stdout();
    let end = run_session(reader, writer, &mut machine, &mut view, intent_rx).await?;

    let score = machine.scoreboard();
    info!(
        "Final score A: {} B: {} draws: {}",
        score.a_wins, score.b_wins, score.draws
    );
    match end {
        SessionEnd::Exited => info!("Goodbye"),
        SessionEnd::OpponentLeft => info!("Opponent left, closing"),
        SessionEnd::ServerClosed => info!("Server closed the connection"),
    }

    // 标准输入线程可能仍阻塞在读取上，直接结束进程
    std::process::exit(0);
}
