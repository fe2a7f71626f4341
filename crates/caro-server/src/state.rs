use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc;

use crate::config::ServerConfig;
use crate::gate::Gate;
use crate::session_loop::SessionCommand;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Command queue of the single room's session task.
    pub session: mpsc::UnboundedSender<SessionCommand>,
    pub gate: Gate,
    pub ws_connection_count: Arc<AtomicUsize>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig, session: mpsc::UnboundedSender<SessionCommand>) -> Self {
        Self {
            session,
            gate: Gate::new(config.auth.password.clone()),
            ws_connection_count: Arc::new(AtomicUsize::new(0)),
            config: Arc::new(config),
        }
    }
}

/// RAII guard for the connection counter.
pub struct ConnectionGuard {
    count: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    pub fn new(count: Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::Relaxed);
        Self { count }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::Relaxed);
    }
}
