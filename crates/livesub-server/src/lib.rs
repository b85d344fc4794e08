//! livesub server.
//!
//! Hosts the subscription core behind a WebSocket endpoint. Every connection
//! is one session: it can subscribe to resources, receives
//! `notifications/resources/updated` frames while subscribed, and has its
//! subscriptions cleared when the connection ends.

pub mod config;
pub mod error;
pub mod protocol;
pub mod routes;
pub mod simulate;
pub mod state;
pub mod ws;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use config::{Args, ServerConfig};
pub use error::ServerError;
pub use state::AppState;

/// Create the Axum router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::health::routes())
        .merge(routes::api::routes())
        .route("/ws", get(ws::ws_session))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
