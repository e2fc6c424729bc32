//! HTTP and WebSocket surface.

pub mod tables;
pub mod websocket;

use std::sync::Arc;

use axum::{Router, routing::get};
use bot_poker::session::SessionDispatcher;
use bot_poker::table::GameController;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<SessionDispatcher>,
    pub controller: Arc<GameController>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(tables::health))
        .route("/games", get(tables::list_games))
        .route("/ws", get(websocket::websocket_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
