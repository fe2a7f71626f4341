use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use tokio::sync::oneshot;

use crate::session_loop::{SessionCommand, SessionReport};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub connections: usize,
    /// Absent when the session task cannot be reached.
    pub room: Option<SessionReport>,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.ws_connection_count.load(Ordering::Relaxed);
    let (reply_tx, reply_rx) = oneshot::channel();
    let room = match state.session.send(SessionCommand::Report { reply: reply_tx }) {
        Ok(()) => reply_rx.await.ok(),
        Err(_) => None,
    };
    let status = if room.is_some() { "healthy" } else { "degraded" };
    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        connections,
        room,
    })
}
