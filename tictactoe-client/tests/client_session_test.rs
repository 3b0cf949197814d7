//! 端到端测试：真实服务端 + 两个完整客户端（状态机 + 会话驱动）。

use std::net::SocketAddr;
use std::time::Duration;

use protocol::{Cell, ClientMessage, GameResult, NetworkConfig, Symbol};
use tictactoe_client::{
    connect, run_session, ClientMachine, GameView, Intent, Phase, Scoreboard, SessionEnd,
};
use tictactoe_server::{GameServer, MessageHandler, ServerConfig, Session};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
enum ViewEvent {
    Identity(Symbol),
    Turn(bool),
    Score(GameResult),
    OpponentLeft,
    Disconnected,
}

/// 把界面调用转发到通道，便于测试按事件推进
struct ChannelView {
    events: mpsc::UnboundedSender<ViewEvent>,
    play_again: bool,
}

impl ChannelView {
    fn emit(&self, event: ViewEvent) {
        let _ = self.events.send(event);
    }
}

impl GameView for ChannelView {
    fn render(&mut self, _cell: Cell, _symbol: Symbol) {}
    fn render_turn_state(&mut self, is_my_turn: bool) {
        self.emit(ViewEvent::Turn(is_my_turn));
    }
    fn set_title_message(&mut self, _text: &str) {}
    fn set_identity(&mut self, symbol: Symbol) {
        self.emit(ViewEvent::Identity(symbol));
    }
    fn reset_board_view(&mut self) {}
    fn set_input_enabled(&mut self, _enabled: bool) {}
    fn increment_score(&mut self, result: GameResult, _tally: &Scoreboard) {
        self.emit(ViewEvent::Score(result));
    }
    fn prompt_play_again(&mut self, _result: GameResult) -> Option<bool> {
        Some(self.play_again)
    }
    fn notify_opponent_left(&mut self) {
        self.emit(ViewEvent::OpponentLeft);
    }
    fn notify_disconnected(&mut self) {
        self.emit(ViewEvent::Disconnected);
    }
}

struct TestClient {
    intents: mpsc::UnboundedSender<Intent>,
    events: mpsc::UnboundedReceiver<ViewEvent>,
    task: JoinHandle<(SessionEnd, ClientMachine)>,
}

impl TestClient {
    async fn start(network: &NetworkConfig, play_again: bool) -> Self {
        let (reader, writer) = connect(network).await.unwrap();
        let (intents, intent_rx) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            let mut machine = ClientMachine::new();
            let mut view = ChannelView {
                events: event_tx,
                play_again,
            };
            let end = run_session(reader, writer, &mut machine, &mut view, intent_rx)
                .await
                .unwrap();
            (end, machine)
        });

        Self {
            intents,
            events,
            task,
        }
    }

    fn send(&self, intent: Intent) {
        self.intents.send(intent).unwrap();
    }

    /// 等待指定事件，期间的其他事件被丢弃并返回
    async fn wait_for(&mut self, wanted: ViewEvent) -> Vec<ViewEvent> {
        let mut skipped = Vec::new();
        loop {
            let event = timeout(WAIT, self.events.recv())
                .await
                .expect("timed out waiting for view event")
                .expect("view dropped");
            if event == wanted {
                return skipped;
            }
            skipped.push(event);
        }
    }

    async fn click(&mut self, row: u8, col: u8) {
        self.wait_for(ViewEvent::Turn(true)).await;
        self.send(Intent::CellClick(Cell::new_unchecked(row, col)));
    }

    async fn finish(self) -> (SessionEnd, ClientMachine, Vec<ViewEvent>) {
        let mut events = self.events;
        let (end, machine) = timeout(WAIT, self.task).await.unwrap().unwrap();
        let mut rest = Vec::new();
        while let Ok(event) = events.try_recv() {
            rest.push(event);
        }
        (end, machine, rest)
    }
}

async fn start_server() -> NetworkConfig {
    let config = ServerConfig {
        network: NetworkConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        ..ServerConfig::default()
    };
    let server = GameServer::bind(&config).await.unwrap();
    let addr: SocketAddr = server.local_addr().unwrap().parse().unwrap();
    tokio::spawn(server.run());
    NetworkConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
    }
}

/// 两个客户端依次加入，返回 (A, B)
async fn join_pair(network: &NetworkConfig, play_again: bool) -> (TestClient, TestClient) {
    let mut first = TestClient::start(network, play_again).await;
    first.send(Intent::SubmitName { nickname: None });
    first.wait_for(ViewEvent::Identity(Symbol::A)).await;

    let mut second = TestClient::start(network, play_again).await;
    second.send(Intent::SubmitName {
        nickname: Some("bob".to_string()),
    });
    second.wait_for(ViewEvent::Identity(Symbol::B)).await;

    (first, second)
}

#[tokio::test]
async fn opponent_exit_is_reported_only_to_the_other_player() {
    let network = start_server().await;
    let (mut a, mut b) = join_pair(&network, false).await;
    b.wait_for(ViewEvent::Turn(false)).await;

    a.send(Intent::RequestExit);

    let (a_end, _, a_events) = a.finish().await;
    let (b_end, _, b_events) = b.finish().await;
    assert_eq!(a_end, SessionEnd::Exited);
    assert!(!a_events.contains(&ViewEvent::OpponentLeft));
    assert_eq!(b_end, SessionEnd::OpponentLeft);
    assert!(b_events.contains(&ViewEvent::OpponentLeft));
}

#[tokio::test]
async fn win_then_rematch_then_exit() {
    let network = start_server().await;
    let (mut a, mut b) = join_pair(&network, true).await;

    // A 占满第一行
    a.click(0, 0).await;
    b.click(1, 0).await;
    a.click(0, 1).await;
    b.click(1, 1).await;
    a.click(0, 2).await;

    // 双方都选择再来一局
    a.wait_for(ViewEvent::Score(GameResult::Win(Symbol::A))).await;
    b.wait_for(ViewEvent::Score(GameResult::Win(Symbol::A))).await;

    // 新一局仍由 A 先手
    a.wait_for(ViewEvent::Turn(true)).await;
    a.send(Intent::RequestExit);

    let (a_end, a_machine, _) = a.finish().await;
    let (b_end, b_machine, _) = b.finish().await;
    assert_eq!(a_end, SessionEnd::Exited);
    assert_eq!(b_end, SessionEnd::OpponentLeft);
    assert_eq!(a_machine.scoreboard().a_wins, 1);
    assert_eq!(b_machine.scoreboard().a_wins, 1);
    assert_eq!(a_machine.board().occupied_count(), 0);
}

#[test]
fn first_player_keeps_the_first_turn_when_join_replies_are_flushed_late() {
    let session = Session::new(true);
    let (tx1, mut rx1) = mpsc::unbounded_channel();
    let (tx2, _rx2) = mpsc::unbounded_channel();
    let p1 = session.registry().register("127.0.0.1:1", tx1);
    let p2 = session.registry().register("127.0.0.1:2", tx2);

    let first = MessageHandler::dispatch(&session, p1, ClientMessage::Name { nickname: None });
    let second = MessageHandler::dispatch(&session, p2, ClientMessage::Name { nickname: None });
    second.flush(&session);
    first.flush(&session);

    let (event_tx, _events) = mpsc::unbounded_channel();
    let mut view = ChannelView {
        events: event_tx,
        play_again: false,
    };
    let mut machine = ClientMachine::new();
    machine.on_intent(Intent::SubmitName { nickname: None }, &mut view);
    while let Ok(msg) = rx1.try_recv() {
        machine.on_message(&msg, &mut view);
    }

    assert_eq!(machine.symbol(), Some(Symbol::A));
    assert!(machine.is_my_turn());
    assert_eq!(machine.phase(), Phase::MyTurn);
}
