pub mod config;
pub mod gate;
pub mod health;
pub mod session_loop;
pub mod state;
pub mod ws;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;

use config::ServerConfig;
use state::AppState;

/// Build the router and shared state, spawning the single-room session task.
pub fn build_app(config: ServerConfig) -> (Router, AppState) {
    let (session_tx, _session_handle) =
        session_loop::spawn_session(config.game.board_size, config.game.turn_secs);
    let state = AppState::new(config, session_tx);

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/healthz", get(health::health_check))
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    (app, state)
}
