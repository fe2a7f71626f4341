use std::collections::HashMap;
use std::time::Duration;

use axum::extract::ws::Utf8Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

use caro_core::net::messages::ClientMessage;
use caro_core::net::protocol::encode_server_message;
use caro_core::player::ConnId;
use caro_core::session::{Effect, GameSession, Phase};

/// Sender half of a connection's outbound frame buffer.
pub type PlayerSender = mpsc::Sender<Utf8Bytes>;

/// Commands sent from the WebSocket handlers to the session task.
#[derive(Debug)]
pub enum SessionCommand {
    /// Register a connection's outbound buffer and seat them.
    Join { conn_id: ConnId, sender: PlayerSender },
    /// A decoded frame from an authenticated connection.
    Inbound { conn_id: ConnId, msg: ClientMessage },
    /// The connection went away.
    Leave { conn_id: ConnId },
    /// Point-in-time room stats for the health endpoint.
    Report { reply: oneshot::Sender<SessionReport> },
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionReport {
    pub phase: Phase,
    pub players: usize,
    pub spectators: usize,
}

/// Spawn the single-room session task. Every game state mutation happens
/// inside it, serialized over the command queue.
pub fn spawn_session(
    board_size: i32,
    turn_secs: u32,
) -> (mpsc::UnboundedSender<SessionCommand>, JoinHandle<()>) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let session = GameSession::new(board_size, turn_secs);
    let handle = tokio::spawn(run_session_loop(session, cmd_rx));
    (cmd_tx, handle)
}

async fn run_session_loop(
    mut session: GameSession,
    mut cmd_rx: mpsc::UnboundedReceiver<SessionCommand>,
) {
    let mut connections: HashMap<ConnId, PlayerSender> = HashMap::new();
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let effects = session.handle_tick();
                dispatch(effects, &connections, &mut interval);
            }
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    break;
                };
                match cmd {
                    SessionCommand::Join { conn_id, sender } => {
                        connections.insert(conn_id, sender);
                        let (role, effects) = session.join(conn_id);
                        tracing::info!(conn = %conn_id, role = ?role, "Joined the room");
                        dispatch(effects, &connections, &mut interval);
                    },
                    SessionCommand::Inbound { conn_id, msg } => {
                        let result = match msg {
                            ClientMessage::ConfirmStart => session.confirm_start(conn_id),
                            ClientMessage::MakeMove { x, y } => session.make_move(conn_id, x, y),
                            ClientMessage::ResetGame => session.request_reset(conn_id),
                            // Authentication happens in the ws layer before join.
                            ClientMessage::VerifyPassword { .. } => Ok(Vec::new()),
                        };
                        match result {
                            Ok(effects) => dispatch(effects, &connections, &mut interval),
                            Err(rejection) => {
                                tracing::debug!(conn = %conn_id, %rejection, "Ignored action");
                            },
                        }
                    },
                    SessionCommand::Leave { conn_id } => {
                        connections.remove(&conn_id);
                        let effects = session.leave(conn_id);
                        tracing::info!(conn = %conn_id, "Left the room");
                        dispatch(effects, &connections, &mut interval);
                    },
                    SessionCommand::Report { reply } => {
                        let _ = reply.send(SessionReport {
                            phase: session.phase(),
                            players: session.player_count(),
                            spectators: session.spectator_count(),
                        });
                    },
                }
            }
        }
    }

    tracing::debug!("Session task stopped");
}

fn dispatch(
    effects: Vec<Effect>,
    connections: &HashMap<ConnId, PlayerSender>,
    interval: &mut Interval,
) {
    for effect in effects {
        match effect {
            Effect::Send(conn_id, msg) => {
                if let Some(sender) = connections.get(&conn_id) {
                    match encode_server_message(&msg) {
                        Ok(text) => try_send(conn_id, sender, Utf8Bytes::from(text)),
                        Err(e) => tracing::error!(error = %e, "Failed to encode message"),
                    }
                }
            },
            Effect::Broadcast(msg) => match encode_server_message(&msg) {
                Ok(text) => {
                    let frame = Utf8Bytes::from(text);
                    for (&conn_id, sender) in connections {
                        try_send(conn_id, sender, frame.clone());
                    }
                },
                Err(e) => tracing::error!(error = %e, "Failed to encode broadcast"),
            },
            // Align the next countdown tick one full second out.
            Effect::ClockStarted => interval.reset(),
        }
    }
}

fn try_send(conn_id: ConnId, sender: &PlayerSender, frame: Utf8Bytes) {
    if let Err(e) = sender.try_send(frame) {
        tracing::debug!(conn = %conn_id, error = %e, "Dropping frame for slow client");
    }
}
