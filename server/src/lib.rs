//! Blob arena server library.
//!
//! This module exposes the server components for use in tests and binaries.

pub mod broadcast;
pub mod config;
pub mod food;
pub mod game_loop;
pub mod handlers;
pub mod player;
pub mod pool;
pub mod power_up;
pub mod registry;
pub mod state;
pub mod ws;

pub use blobarena_shared::protocol;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

/// HTTP routes: the WebSocket endpoint at `/ws`.
pub fn router(app_state: ws::AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
