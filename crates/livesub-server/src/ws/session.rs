use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use serde_json::Value;
use tokio::sync::mpsc;

use livesub_core::{ChannelSink, ResourceUpdated, Session, SessionHandle};

use crate::error::ServerError;
use crate::protocol::{handle_request, Request, ServerMessage};
use crate::state::AppState;

/// WebSocket upgrade handler; each connection is one session
pub async fn ws_session(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sink, notifications) = ChannelSink::channel(state.config.notification_buffer);
    let session = Session::new(sink);
    let lifecycle = state.lifecycle.clone();

    // Subscriptions are cleared however the loop exits.
    lifecycle
        .run(
            session.clone(),
            session_loop(socket, state, session, notifications),
        )
        .await;
}

async fn session_loop(
    mut socket: WebSocket,
    state: AppState,
    session: SessionHandle,
    mut notifications: mpsc::Receiver<ResourceUpdated>,
) {
    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::warn!(session = %session.id(), error = %e, "websocket error");
                        break;
                    }
                };

                let reply = match serde_json::from_str::<Request>(&text) {
                    Ok(request) => handle_request(&state, &session, request),
                    Err(e) => ServerMessage::error(
                        Value::Null,
                        &ServerError::InvalidRequest(format!("malformed frame: {}", e)),
                    ),
                };

                if let Err(e) = send(&mut socket, &reply).await {
                    tracing::debug!(session = %session.id(), error = %e, "reply not sent");
                    break;
                }
            }
            Some(update) = notifications.recv() => {
                if let Err(e) = send(&mut socket, &ServerMessage::notification(update)).await {
                    tracing::debug!(session = %session.id(), error = %e, "notification not sent");
                    break;
                }
            }
        }
    }
}

async fn send(socket: &mut WebSocket, message: &ServerMessage) -> Result<(), ServerError> {
    let text = serde_json::to_string(message).map_err(|e| ServerError::Internal(e.to_string()))?;
    socket
        .send(Message::Text(text))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))
}
