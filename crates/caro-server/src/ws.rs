use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use caro_core::net::messages::{ClientMessage, ServerMessage};
use caro_core::net::protocol::{MAX_MESSAGE_SIZE, decode_client_message, encode_server_message};
use caro_core::player::ConnId;

use crate::session_loop::{PlayerSender, SessionCommand};
use crate::state::{AppState, ConnectionGuard};

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let max = state.config.limits.max_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max {
        tracing::warn!(current, max, "Rejecting connection, room is full");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    let conn_id: ConnId = Uuid::new_v4();
    tracing::info!(conn = %conn_id, "Connection opened");

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Closed gate: nothing reaches the room until a password clears it.
    if !state.gate.is_open()
        && !await_password(&mut ws_sender, &mut ws_receiver, &state, conn_id).await
    {
        tracing::info!(conn = %conn_id, "Closed before authenticating");
        return;
    }

    let (tx, rx) = mpsc::channel::<Utf8Bytes>(state.config.limits.message_buffer);
    if state
        .session
        .send(SessionCommand::Join {
            conn_id,
            sender: tx.clone(),
        })
        .is_err()
    {
        tracing::error!(conn = %conn_id, "Session task is gone");
        return;
    }

    spawn_writer(ws_sender, rx);
    read_loop(&mut ws_receiver, &state, conn_id, &tx).await;

    let _ = state.session.send(SessionCommand::Leave { conn_id });
    tracing::info!(conn = %conn_id, "Connection closed");
}

/// Consume frames until a valid password arrives. Anything else from an
/// unauthenticated connection is dropped. Returns false when the socket
/// closes first.
async fn await_password(
    ws_sender: &mut SplitSink<WebSocket, Message>,
    ws_receiver: &mut SplitStream<WebSocket>,
    state: &AppState,
    conn_id: ConnId,
) -> bool {
    let rate = state.config.limits.messages_per_sec;
    let mut rate_limiter = RateLimiter::new(rate, rate);

    while let Some(Ok(msg)) = ws_receiver.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => return false,
            _ => continue,
        };
        if !rate_limiter.allow() {
            tracing::warn!(conn = %conn_id, "Rate limited during authentication");
            continue;
        }
        let Ok(client_msg) = decode_client_message(text.as_str()) else {
            continue;
        };
        let ClientMessage::VerifyPassword { password } = client_msg else {
            tracing::debug!(conn = %conn_id, "Dropping pre-auth frame");
            continue;
        };
        if state.gate.verify(&password) {
            tracing::info!(conn = %conn_id, "Password accepted");
            return send_direct(ws_sender, &ServerMessage::PasswordOk).await;
        }
        tracing::info!(conn = %conn_id, "Password rejected");
        if !send_direct(ws_sender, &ServerMessage::PasswordFail).await {
            return false;
        }
    }
    false
}

async fn send_direct(ws_sender: &mut SplitSink<WebSocket, Message>, msg: &ServerMessage) -> bool {
    match encode_server_message(msg) {
        Ok(text) => ws_sender.send(Message::Text(Utf8Bytes::from(text))).await.is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode gate reply");
            false
        },
    }
}

/// Forward the connection's outbound buffer to the socket until either side
/// goes away.
fn spawn_writer(mut ws_sender: SplitSink<WebSocket, Message>, mut rx: mpsc::Receiver<Utf8Bytes>) {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });
}

async fn read_loop(
    ws_receiver: &mut SplitStream<WebSocket>,
    state: &AppState,
    conn_id: ConnId,
    tx: &PlayerSender,
) {
    let rate = state.config.limits.messages_per_sec;
    let mut rate_limiter = RateLimiter::new(rate, rate);

    while let Some(Ok(msg)) = ws_receiver.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        if !rate_limiter.allow() {
            tracing::warn!(conn = %conn_id, "Rate limited");
            continue;
        }
        if text.len() > MAX_MESSAGE_SIZE {
            tracing::warn!(conn = %conn_id, size = text.len(), "Dropping oversized frame");
            continue;
        }

        let client_msg = match decode_client_message(text.as_str()) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(conn = %conn_id, error = %e, "Dropping undecodable frame");
                continue;
            },
        };

        // Already past the gate; just acknowledge repeat verifications.
        if let ClientMessage::VerifyPassword { .. } = client_msg {
            if let Ok(text) = encode_server_message(&ServerMessage::PasswordOk) {
                let _ = tx.try_send(Utf8Bytes::from(text));
            }
            continue;
        }

        if state
            .session
            .send(SessionCommand::Inbound {
                conn_id,
                msg: client_msg,
            })
            .is_err()
        {
            break;
        }
    }
}

/// Token bucket for inbound frames.
struct RateLimiter {
    tokens: f64,
    max_tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl RateLimiter {
    fn new(max_tokens: f64, refill_per_sec: f64) -> Self {
        Self {
            tokens: max_tokens,
            max_tokens,
            refill_per_sec,
            last_refill: Instant::now(),
        }
    }

    fn allow(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.last_refill = now;
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.max_tokens);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}
