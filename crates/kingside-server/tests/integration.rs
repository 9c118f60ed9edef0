//! End-to-end tests driving the registry through its command mailbox, with
//! channel-backed clients standing in for websocket connections.

use tokio::sync::{mpsc, oneshot};

use kingside_protocol::{
    ClientMessage, Color, GameId, GameMode, PlayerId, ServerMessage, TimeControl,
};
use kingside_server::config::ServerConfig;
use kingside_server::registry::{Command, Registry};

struct TestClient {
    id: PlayerId,
    rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl TestClient {
    fn recv(&mut self) -> ServerMessage {
        self.rx.try_recv().expect("expected a pending message")
    }

    fn drain(&mut self) {
        while self.rx.try_recv().is_ok() {}
    }

    fn assert_silent(&mut self) {
        assert!(self.rx.try_recv().is_err(), "expected no pending messages");
    }
}

struct Harness {
    registry: Registry,
    // Held so ticker tasks have a live mailbox; tests tick manually.
    _commands: mpsc::UnboundedSender<Command>,
    _mailbox: mpsc::UnboundedReceiver<Command>,
}

impl Harness {
    fn new() -> Self {
        let (registry, commands, mailbox) = Registry::new(ServerConfig::default());
        Self {
            registry,
            _commands: commands,
            _mailbox: mailbox,
        }
    }

    fn connect(&mut self) -> TestClient {
        let (out, rx) = mpsc::unbounded_channel();
        let (reply, mut reply_rx) = oneshot::channel();
        self.registry.handle(Command::Connect { out, reply });
        let id = reply_rx.try_recv().expect("connect reply");
        TestClient { id, rx }
    }

    fn send(&mut self, client: &TestClient, message: &ClientMessage) {
        self.registry.handle(Command::Inbound {
            player: client.id,
            raw: serde_json::to_string(message).expect("encodable test frame"),
        });
    }

    fn send_raw(&mut self, client: &TestClient, raw: &str) {
        self.registry.handle(Command::Inbound {
            player: client.id,
            raw: raw.to_string(),
        });
    }

    fn disconnect(&mut self, client: &TestClient) {
        self.registry.handle(Command::Disconnect { player: client.id });
    }

    fn tick(&mut self, game: GameId) {
        self.registry.handle(Command::ClockTick { game });
    }
}

fn register(harness: &mut Harness, client: &TestClient, name: &str) {
    harness.send(
        client,
        &ClientMessage::Register {
            name: name.to_string(),
        },
    );
}

fn create_game(harness: &mut Harness, host: &mut TestClient, time: f64) -> (GameId, Color) {
    harness.send(
        host,
        &ClientMessage::CreateGame {
            mode: GameMode::Standard,
            time_control: TimeControl {
                time,
                increment: 0.0,
            },
        },
    );
    match host.recv() {
        ServerMessage::GameCreated { game_id, color, .. } => (game_id, color),
        other => panic!("expected game_created, got {other:?}"),
    }
}

/// Two registered players in a playing game. Returns (white, black, game id).
fn playing_game(harness: &mut Harness, time: f64) -> (TestClient, TestClient, GameId) {
    let mut host = harness.connect();
    let mut joiner = harness.connect();
    register(harness, &host, "alice");
    register(harness, &joiner, "bob");

    let (game_id, host_color) = create_game(harness, &mut host, time);
    harness.send(&joiner, &ClientMessage::JoinGame { game_id });
    host.drain();
    joiner.drain();

    match host_color {
        Color::White => (host, joiner, game_id),
        Color::Black => (joiner, host, game_id),
    }
}

fn make_move(harness: &mut Harness, client: &TestClient, game_id: GameId, mv: (&str, &str, Color)) {
    harness.send(
        client,
        &ClientMessage::MakeMove {
            game_id,
            from: mv.0.to_string(),
            to: mv.1.to_string(),
            player_color: mv.2,
        },
    );
}

fn expect_error(client: &mut TestClient, text: &str) {
    match client.recv() {
        ServerMessage::Error { message } => assert_eq!(message, text),
        other => panic!("expected error {text:?}, got {other:?}"),
    }
}

fn expect_game_over(client: &mut TestClient, text: &str) {
    match client.recv() {
        ServerMessage::GameOver { result } => assert_eq!(result, text),
        other => panic!("expected game_over, got {other:?}"),
    }
}

#[tokio::test]
async fn create_and_join_handshake() {
    let mut harness = Harness::new();
    let mut host = harness.connect();
    let mut joiner = harness.connect();
    register(&mut harness, &host, "alice");
    register(&mut harness, &joiner, "bob");

    let (game_id, host_color) = create_game(&mut harness, &mut host, 300.0);
    // The creator is in a game now, so only the other player sees the lobby.
    host.assert_silent();
    match joiner.recv() {
        ServerMessage::WaitingGames {
            games,
            global_stats,
        } => {
            assert_eq!(games.len(), 1);
            assert_eq!(games[0].id, game_id);
            assert_eq!(games[0].host_name.as_deref(), Some("alice"));
            assert_eq!(games[0].time_control.name, "5+0");
            assert_eq!(global_stats.captured_pawns, 0);
        }
        other => panic!("expected waiting_games, got {other:?}"),
    }

    harness.send(&joiner, &ClientMessage::JoinGame { game_id });
    match joiner.recv() {
        ServerMessage::GameJoined {
            game_id: joined,
            color,
            position,
            opponent,
            time_control,
        } => {
            assert_eq!(joined, game_id);
            assert_eq!(color, host_color.opposite());
            assert_eq!(position.len(), 32);
            assert_eq!(opponent.as_deref(), Some("alice"));
            assert_eq!(time_control.white, 300.0);
            assert_eq!(time_control.black, 300.0);
        }
        other => panic!("expected game_joined, got {other:?}"),
    }
    match host.recv() {
        ServerMessage::OpponentJoined { opponent, .. } => {
            assert_eq!(opponent.as_deref(), Some("bob"));
        }
        other => panic!("expected opponent_joined, got {other:?}"),
    }
    // Both are seated; the post-join lobby broadcast reaches nobody.
    host.assert_silent();
    joiner.assert_silent();
}

#[tokio::test]
async fn join_error_catalog() {
    let mut harness = Harness::new();
    let mut host = harness.connect();
    let mut joiner = harness.connect();
    let mut straggler = harness.connect();

    let (game_id, _) = create_game(&mut harness, &mut host, 300.0);

    harness.send(&joiner, &ClientMessage::JoinGame { game_id: GameId::new() });
    joiner.drain();
    harness.send(&joiner, &ClientMessage::JoinGame { game_id: GameId::new() });
    expect_error(&mut joiner, "Game not found");

    harness.send(&host, &ClientMessage::JoinGame { game_id });
    expect_error(&mut host, "Cannot join your own game");

    harness.send(&joiner, &ClientMessage::JoinGame { game_id });
    joiner.drain();
    straggler.drain();
    harness.send(&straggler, &ClientMessage::JoinGame { game_id });
    expect_error(&mut straggler, "Game is no longer available");
}

#[tokio::test]
async fn moves_flow_and_resignation_ends_the_game() {
    let mut harness = Harness::new();
    let (mut white, mut black, game_id) = playing_game(&mut harness, 300.0);

    make_move(&mut harness, &white, game_id, ("e2", "e4", Color::White));
    for client in [&mut white, &mut black] {
        match client.recv() {
            ServerMessage::MoveMade {
                mv,
                position,
                next_turn,
                stats,
                ..
            } => {
                assert_eq!(mv.from, "e2");
                assert_eq!(mv.to, "e4");
                assert_eq!(mv.color, Color::White);
                assert_eq!(next_turn, Color::Black);
                assert_eq!(stats, None);
                assert!(position.contains_key("e4"));
                assert!(!position.contains_key("e2"));
            }
            other => panic!("expected move_made, got {other:?}"),
        }
    }

    harness.send(&black, &ClientMessage::Resign { game_id });
    expect_game_over(&mut white, "White wins by resignation");
    expect_game_over(&mut black, "White wins by resignation");

    // The game is gone; further moves bounce.
    make_move(&mut harness, &white, game_id, ("d2", "d4", Color::White));
    expect_error(&mut white, "Game not found");
}

#[tokio::test]
async fn turn_and_legality_are_enforced() {
    let mut harness = Harness::new();
    let (mut white, mut black, game_id) = playing_game(&mut harness, 300.0);

    make_move(&mut harness, &black, game_id, ("e7", "e5", Color::Black));
    expect_error(&mut black, "Not your turn");

    make_move(&mut harness, &white, game_id, ("e2", "e5", Color::White));
    expect_error(&mut white, "Invalid move");

    make_move(&mut harness, &white, game_id, ("e2", "e4", Color::White));
    assert!(matches!(white.recv(), ServerMessage::MoveMade { .. }));
    black.drain();

    // A stranger to the game cannot move in it.
    let mut outsider = harness.connect();
    make_move(&mut harness, &outsider, game_id, ("e7", "e5", Color::Black));
    expect_error(&mut outsider, "Game not found");
}

#[tokio::test]
async fn captures_feed_the_global_counters() {
    let mut harness = Harness::new();
    let (mut white, mut black, game_id) = playing_game(&mut harness, 300.0);

    make_move(&mut harness, &white, game_id, ("e2", "e4", Color::White));
    make_move(&mut harness, &black, game_id, ("d7", "d5", Color::Black));
    make_move(&mut harness, &white, game_id, ("e4", "d5", Color::White));
    white.drain();
    for _ in 0..2 {
        black.recv();
    }
    match black.recv() {
        ServerMessage::MoveMade { stats, .. } => {
            let stats = stats.expect("capture publishes a stats delta");
            assert_eq!(stats.captured_pawns, Some(1));
            assert_eq!(stats.captured_queens, None);
        }
        other => panic!("expected move_made, got {other:?}"),
    }

    // A spectator in the lobby sees the new totals.
    let mut lurker = harness.connect();
    harness.send(&lurker, &ClientMessage::GetWaitingGames {});
    match lurker.recv() {
        ServerMessage::WaitingGames { global_stats, .. } => {
            assert_eq!(global_stats.captured_pawns, 1);
            assert_eq!(global_stats.captured_queens, 0);
        }
        other => panic!("expected waiting_games, got {other:?}"),
    }
}

#[tokio::test]
async fn draw_offer_lifecycle() {
    let mut harness = Harness::new();
    let (mut white, mut black, game_id) = playing_game(&mut harness, 300.0);

    harness.send(&white, &ClientMessage::OfferDraw { game_id });
    assert!(matches!(black.recv(), ServerMessage::DrawOffered {}));
    white.assert_silent();

    // The offerer cannot answer their own offer.
    harness.send(&white, &ClientMessage::AcceptDraw { game_id });
    expect_error(&mut white, "No valid draw offer");

    harness.send(&black, &ClientMessage::DeclineDraw { game_id });
    assert!(matches!(white.recv(), ServerMessage::DrawDeclined {}));

    // Declined means gone.
    harness.send(&black, &ClientMessage::AcceptDraw { game_id });
    expect_error(&mut black, "No valid draw offer");

    harness.send(&white, &ClientMessage::OfferDraw { game_id });
    black.drain();
    harness.send(&black, &ClientMessage::AcceptDraw { game_id });
    expect_game_over(&mut white, "Draw by agreement");
    expect_game_over(&mut black, "Draw by agreement");
}

#[tokio::test]
async fn opposing_move_supersedes_a_draw_offer() {
    let mut harness = Harness::new();
    let (mut white, mut black, game_id) = playing_game(&mut harness, 300.0);

    make_move(&mut harness, &white, game_id, ("e2", "e4", Color::White));
    white.drain();
    black.drain();

    harness.send(&white, &ClientMessage::OfferDraw { game_id });
    black.drain();
    make_move(&mut harness, &black, game_id, ("e7", "e5", Color::Black));
    white.drain();
    black.drain();

    harness.send(&black, &ClientMessage::AcceptDraw { game_id });
    expect_error(&mut black, "No valid draw offer");
}

#[tokio::test]
async fn waiting_game_vanishes_when_the_host_leaves() {
    let mut harness = Harness::new();
    let mut host = harness.connect();
    let mut watcher = harness.connect();

    let (game_id, _) = create_game(&mut harness, &mut host, 300.0);
    watcher.drain();

    harness.disconnect(&host);
    match watcher.recv() {
        ServerMessage::WaitingGames { games, .. } => assert!(games.is_empty()),
        other => panic!("expected waiting_games, got {other:?}"),
    }

    // No game left to join.
    harness.send(&watcher, &ClientMessage::JoinGame { game_id });
    expect_error(&mut watcher, "Game not found");
}

#[tokio::test]
async fn mid_game_disconnection_forfeits() {
    let mut harness = Harness::new();
    let (white, mut black, _game_id) = playing_game(&mut harness, 300.0);

    harness.disconnect(&white);
    expect_game_over(&mut black, "Black wins by disconnection");
}

#[tokio::test]
async fn flag_fall_ends_the_game_on_time() {
    let mut harness = Harness::new();
    // Base time below the flag threshold: the first tick flags white.
    let (mut white, mut black, game_id) = playing_game(&mut harness, 0.04);

    harness.tick(game_id);
    expect_game_over(&mut white, "Black wins on time");
    expect_game_over(&mut black, "Black wins on time");

    // Late ticks from a dead game's ticker are ignored.
    harness.tick(game_id);
    white.assert_silent();
    black.assert_silent();
}

#[tokio::test]
async fn undecodable_frames_get_distinct_errors() {
    let mut harness = Harness::new();
    let mut client = harness.connect();

    harness.send_raw(&client, "not json at all");
    expect_error(&mut client, "Invalid message format");

    harness.send_raw(&client, r#"{"type":"teleport","data":{}}"#);
    expect_error(&mut client, "Unknown message type");

    harness.send_raw(&client, r#"{"type":"join_game","data":{"gameId":42}}"#);
    expect_error(&mut client, "Invalid message format");
}
