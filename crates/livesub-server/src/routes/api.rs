//! Resource admin routes.

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use livesub_core::{ResourceContents, ResourceId, ResourceStore};

use crate::error::Result;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/resources", get(list_resources))
        .route("/api/resources/read", get(read_resource))
        .route("/api/resources/touch", post(touch_resource))
}

#[derive(Debug, Deserialize)]
pub struct UriQuery {
    pub uri: String,
}

async fn list_resources(State(state): State<AppState>) -> Json<Value> {
    let resources: Vec<Value> = state
        .store
        .list()
        .into_iter()
        .map(|r| json!({ "uri": r.id, "version": r.version }))
        .collect();
    Json(json!({ "resources": resources }))
}

async fn read_resource(
    State(state): State<AppState>,
    Query(query): Query<UriQuery>,
) -> Result<Json<ResourceContents>> {
    let contents = state.store.read(&ResourceId::new(query.uri))?;
    Ok(Json(contents))
}

/// Bump a resource's version and wake the broadcaster.
async fn touch_resource(
    State(state): State<AppState>,
    Json(body): Json<UriQuery>,
) -> Result<Json<Value>> {
    let id = ResourceId::new(body.uri);
    let version = state.store.touch(&id)?;
    state.broadcast.trigger();

    tracing::debug!(uri = %id, version, "resource touched via api");
    Ok(Json(json!({ "uri": id, "version": version })))
}
