use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "livesub-server",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": {
            "active": state.lifecycle.active_sessions(),
            "subscribed": state.registry.session_count(),
        },
        "subscriptions": state.registry.subscription_count(),
        "resources": state.store.len(),
        "broadcaster": {
            "running": state.broadcast.is_running(),
            "stats": state.broadcaster.stats().snapshot(),
        }
    }))
}
