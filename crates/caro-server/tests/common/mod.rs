#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use caro_core::board::Mark;
use caro_core::net::messages::{ClientMessage, PlacedMark, ServerMessage};
use caro_core::net::protocol::{decode_server_message, encode_client_message};
use caro_core::player::Role;
use caro_server::build_app;
use caro_server::config::{AuthConfig, GameConfig, ServerConfig};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A server bound to an ephemeral port for one test.
pub struct TestServer {
    pub addr: SocketAddr,
    _server: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Open gate, default rules.
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    pub async fn with_password(password: &str) -> Self {
        let config = ServerConfig {
            auth: AuthConfig {
                password: Some(password.to_string()),
            },
            ..ServerConfig::default()
        };
        Self::from_config(config).await
    }

    pub async fn with_game(game: GameConfig) -> Self {
        let config = ServerConfig {
            game,
            ..ServerConfig::default()
        };
        Self::from_config(config).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind test listener");
        let addr = listener.local_addr().expect("listener should have an address");
        let (app, _state) = build_app(config);
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server should run");
        });
        // Give the listener a moment to start accepting.
        tokio::time::sleep(Duration::from_millis(20)).await;
        Self {
            addr,
            _server: server,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn health_url(&self) -> String {
        format!("http://{}/healthz", self.addr)
    }
}

pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = connect_async(url).await.expect("should connect");
    stream
}

pub async fn ws_send(stream: &mut WsStream, msg: &ClientMessage) {
    let text = encode_client_message(msg).expect("should encode");
    stream
        .send(Message::Text(text.into()))
        .await
        .expect("should send");
}

/// Read the next server message, skipping non-text frames. Panics after 5s.
pub async fn ws_read(stream: &mut WsStream) -> ServerMessage {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return decode_server_message(text.as_str()).expect("frame should decode");
                },
                Some(Ok(_)) => continue,
                other => panic!("WebSocket closed while waiting: {other:?}"),
            }
        }
    })
    .await
    .expect("should receive a message in time")
}

/// Read the next non-timer message; countdown broadcasts are noise for most
/// assertions.
pub async fn ws_read_skip_timers(stream: &mut WsStream) -> ServerMessage {
    loop {
        match ws_read(stream).await {
            ServerMessage::Timer { .. } => continue,
            msg => return msg,
        }
    }
}

/// Try to read any server message; `None` when the connection stays quiet.
pub async fn ws_try_read(stream: &mut WsStream, timeout_ms: u64) -> Option<ServerMessage> {
    tokio::time::timeout(Duration::from_millis(timeout_ms), async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return decode_server_message(text.as_str()).expect("frame should decode");
                },
                Some(Ok(_)) => continue,
                _ => std::future::pending::<()>().await,
            }
        }
    })
    .await
    .ok()
}

/// Like [`ws_try_read`] but ignores countdown noise. Used to assert that a
/// rejected action produced no game traffic.
pub async fn ws_try_read_game(stream: &mut WsStream, timeout_ms: u64) -> Option<ServerMessage> {
    tokio::time::timeout(Duration::from_millis(timeout_ms), async {
        loop {
            match ws_read(stream).await {
                ServerMessage::Timer { .. } => continue,
                msg => return msg,
            }
        }
    })
    .await
    .ok()
}

/// Clear a password gate, panicking on rejection.
pub async fn ws_authenticate(stream: &mut WsStream, password: &str) {
    ws_send(
        stream,
        &ClientMessage::VerifyPassword {
            password: password.to_string(),
        },
    )
    .await;
    match ws_read(stream).await {
        ServerMessage::PasswordOk => {},
        other => panic!("Expected password_ok, got: {other:?}"),
    }
}

/// Connect to an open-gate server and drain the join hello.
pub async fn join_room(server: &TestServer) -> (WsStream, Role) {
    let mut stream = ws_connect(&server.ws_url()).await;
    let role = read_join_hello(&mut stream).await;
    (stream, role)
}

/// Drain assign_role, state, timer and the occupancy broadcast, returning
/// the assigned role.
pub async fn read_join_hello(stream: &mut WsStream) -> Role {
    let role = match ws_read(stream).await {
        ServerMessage::AssignRole { role } => role,
        other => panic!("Expected assign_role, got: {other:?}"),
    };
    match ws_read(stream).await {
        ServerMessage::State(_) => {},
        other => panic!("Expected state, got: {other:?}"),
    }
    match ws_read(stream).await {
        ServerMessage::Timer { .. } => {},
        other => panic!("Expected timer, got: {other:?}"),
    }
    match ws_read(stream).await {
        ServerMessage::ReadyToStart | ServerMessage::WaitingForPlayers => {},
        other => panic!("Expected occupancy notification, got: {other:?}"),
    }
    role
}

/// Seat two players and complete the start handshake. Both streams are
/// fully drained when this returns.
pub async fn setup_game(server: &TestServer) -> (WsStream, WsStream) {
    let (mut a, role_a) = join_room(server).await;
    assert_eq!(role_a, Role::X, "first joiner should seat X");
    let (mut b, role_b) = join_room(server).await;
    assert_eq!(role_b, Role::O, "second joiner should seat O");

    // The second join re-announces readiness to the whole room.
    match ws_read(&mut a).await {
        ServerMessage::ReadyToStart => {},
        other => panic!("Expected ready_to_start, got: {other:?}"),
    }

    ws_send(&mut a, &ClientMessage::ConfirmStart).await;
    for stream in [&mut a, &mut b] {
        match ws_read(stream).await {
            ServerMessage::StartConfirmUpdate { confirmed } => {
                assert!(confirmed.x && !confirmed.o);
            },
            other => panic!("Expected start_confirm_update, got: {other:?}"),
        }
    }

    ws_send(&mut b, &ClientMessage::ConfirmStart).await;
    for stream in [&mut a, &mut b] {
        match ws_read(stream).await {
            ServerMessage::StartConfirmUpdate { confirmed } => assert!(confirmed.both()),
            other => panic!("Expected start_confirm_update, got: {other:?}"),
        }
        match ws_read(stream).await {
            ServerMessage::State(state) => assert!(state.winner.is_none()),
            other => panic!("Expected state, got: {other:?}"),
        }
        match ws_read(stream).await {
            ServerMessage::LastMove { placed } => assert!(placed.is_none()),
            other => panic!("Expected last_move, got: {other:?}"),
        }
        match ws_read(stream).await {
            ServerMessage::GameStarted => {},
            other => panic!("Expected game_started, got: {other:?}"),
        }
        match ws_read(stream).await {
            ServerMessage::Timer { .. } => {},
            other => panic!("Expected timer, got: {other:?}"),
        }
    }
    (a, b)
}

/// Send a move and drain the placement and state broadcasts on both streams.
pub async fn play_move(mover: &mut WsStream, other: &mut WsStream, x: i32, y: i32, mark: Mark) {
    ws_send(mover, &ClientMessage::MakeMove { x, y }).await;
    for stream in [mover, other] {
        match ws_read_skip_timers(stream).await {
            ServerMessage::LastMove { placed: Some(placed) } => {
                assert_eq!((placed.x, placed.y, placed.mark), (x, y, mark));
            },
            msg => panic!("Expected last_move, got: {msg:?}"),
        }
        match ws_read_skip_timers(stream).await {
            ServerMessage::State(_) => {},
            msg => panic!("Expected state, got: {msg:?}"),
        }
    }
}

/// Read frames until a placement arrives, skipping countdown noise.
pub async fn read_until_placement(stream: &mut WsStream) -> PlacedMark {
    loop {
        match ws_read(stream).await {
            ServerMessage::LastMove { placed: Some(placed) } => return placed,
            ServerMessage::Timer { .. } => continue,
            other => panic!("Expected last_move or timer, got: {other:?}"),
        }
    }
}
