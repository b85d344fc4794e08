//! WebSocket message protocol.
//!
//! Requests and replies are JSON-RPC shaped text frames:
//! `{"id": 1, "method": "resources/subscribe", "params": {"uri": "..."}}`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use livesub_core::{ResourceId, ResourceStore, ResourceUpdated, SessionHandle};

use crate::error::{Result, ServerError};
use crate::state::AppState;

pub const METHOD_SUBSCRIBE: &str = "resources/subscribe";
pub const METHOD_UNSUBSCRIBE: &str = "resources/unsubscribe";
pub const METHOD_READ: &str = "resources/read";
pub const METHOD_LIST: &str = "resources/list";
pub const METHOD_SUBSCRIPTIONS: &str = "resources/subscriptions";

/// Client request frame.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct UriParams {
    uri: String,
}

/// Error payload of a failed request.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorObject {
    pub code: &'static str,
    pub message: String,
}

/// Server frame: a reply or a notification.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Result {
        id: Value,
        result: Value,
    },
    Error {
        id: Value,
        error: ErrorObject,
    },
    Notification {
        method: &'static str,
        params: ResourceUpdated,
    },
}

impl ServerMessage {
    pub fn error(id: Value, err: &ServerError) -> Self {
        ServerMessage::Error {
            id,
            error: ErrorObject {
                code: err.code(),
                message: err.to_string(),
            },
        }
    }

    pub fn notification(update: ResourceUpdated) -> Self {
        ServerMessage::Notification {
            method: update.method(),
            params: update,
        }
    }
}

/// Dispatch one request on behalf of `session`.
pub fn handle_request(state: &AppState, session: &SessionHandle, request: Request) -> ServerMessage {
    let id = request.id.clone();
    match dispatch(state, session, &request) {
        Ok(result) => ServerMessage::Result { id, result },
        Err(err) => {
            tracing::debug!(
                session = %session.id(),
                method = %request.method,
                error = %err,
                "request failed"
            );
            ServerMessage::error(id, &err)
        }
    }
}

fn dispatch(state: &AppState, session: &SessionHandle, request: &Request) -> Result<Value> {
    match request.method.as_str() {
        METHOD_SUBSCRIBE => {
            let uri = uri_param(request)?;
            // Resolve first so unknown resources are rejected rather than watched.
            state.store.read(&uri)?;
            state.registry.subscribe(&uri, session)?;
            Ok(json!({}))
        }
        METHOD_UNSUBSCRIBE => {
            let uri = uri_param(request)?;
            state.registry.unsubscribe(&uri, session)?;
            Ok(json!({}))
        }
        METHOD_READ => {
            let uri = uri_param(request)?;
            let contents = state.store.read(&uri)?;
            Ok(json!({ "contents": [contents] }))
        }
        METHOD_LIST => {
            let resources: Vec<Value> = state
                .store
                .list()
                .into_iter()
                .map(|r| json!({ "uri": r.id, "version": r.version }))
                .collect();
            Ok(json!({ "resources": resources }))
        }
        METHOD_SUBSCRIPTIONS => {
            let uris = state.registry.resources_of(session.id());
            Ok(json!({ "uris": uris }))
        }
        other => Err(ServerError::MethodNotFound(other.to_string())),
    }
}

fn uri_param(request: &Request) -> Result<ResourceId> {
    let params = request
        .params
        .clone()
        .ok_or_else(|| ServerError::InvalidRequest("missing params".to_string()))?;
    let params: UriParams = serde_json::from_value(params)
        .map_err(|e| ServerError::InvalidRequest(format!("invalid params: {}", e)))?;
    Ok(ResourceId::new(params.uri))
}
