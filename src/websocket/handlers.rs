use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth;
use crate::state::AppState;
use crate::websocket::events::{ClientEvent, ServerEvent};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// Live connection endpoint.
///
/// Identity comes only from a verified token (query parameter or bearer
/// header); a client-asserted user id is never trusted. A connection may
/// also open with no token at all: it is accepted but stays unidentified,
/// invisible to fan-out, and every event it sends is rejected on that socket
/// only. An invalid token is refused at upgrade time.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let identity = match resolve_identity(&state, &params, &headers) {
        Ok(identity) => identity,
        Err(status) => return status.into_response(),
    };
    ws.on_upgrade(move |socket| handle_socket(state, identity, socket))
}

fn resolve_identity(
    state: &AppState,
    params: &WsParams,
    headers: &HeaderMap,
) -> Result<Option<Uuid>, StatusCode> {
    let token = params
        .token
        .clone()
        .or_else(|| auth::bearer_token(headers));
    match token {
        None => Ok(None),
        Some(token) => auth::verify_token(&token, &state.config.jwt_secret)
            .map(Some)
            .map_err(|_| StatusCode::UNAUTHORIZED),
    }
}

async fn handle_socket(state: AppState, identity: Option<Uuid>, socket: WebSocket) {
    match identity {
        Some(user_id) => identified_session(state, user_id, socket).await,
        None => anonymous_session(socket).await,
    }
}

/// A connection that never identified itself. Kept open, but it receives no
/// pushes and every inbound event is answered with an error.
async fn anonymous_session(mut socket: WebSocket) {
    while let Some(Ok(msg)) = socket.next().await {
        match msg {
            Message::Text(_) => {
                let reply = ServerEvent::Error {
                    code: "INVALID_CREDENTIALS".into(),
                    message: "connection is not identified; reconnect with a token".into(),
                };
                let Ok(payload) = serde_json::to_string(&reply) else {
                    continue;
                };
                if socket.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
}

async fn identified_session(state: AppState, user_id: Uuid, socket: WebSocket) {
    let (connection_id, mut rx) = state.chat.presence().register(user_id).await;
    tracing::info!(%user_id, %connection_id, "live connection identified");

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            // Outbound pushes queued for this connection.
            queued = rx.recv() => {
                match queued {
                    Some(msg) => {
                        if sender.send(msg).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            // Inbound client events, handled strictly in arrival order.
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(txt))) => {
                        if let Err(err) = handle_client_event(&state, user_id, &txt).await {
                            // rejection goes to the requesting socket only
                            let reply = ServerEvent::from_error(&err);
                            let Ok(payload) = serde_json::to_string(&reply) else {
                                continue;
                            };
                            if sender.send(Message::Text(payload)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // ping/pong handled by the framework
                    Some(Err(e)) => {
                        tracing::warn!(%user_id, error = %e, "live connection transport error");
                        break;
                    }
                }
            }
        }
    }

    state.chat.presence().unregister(connection_id).await;
    state.chat.connection_closed(user_id).await;
    tracing::info!(%user_id, %connection_id, "live connection closed");
}

/// Dispatch one inbound event. The acting user is always the connection's
/// verified identity, never an id carried in the event payload.
async fn handle_client_event(state: &AppState, user_id: Uuid, raw: &str) -> Result<(), AppError> {
    let event: ClientEvent = serde_json::from_str(raw)
        .map_err(|e| AppError::Validation(format!("malformed event: {e}")))?;

    match event {
        ClientEvent::SendMessage {
            receiver_id,
            content,
            attachment_url,
        } => {
            state
                .chat
                .send_message(user_id, receiver_id, content, attachment_url)
                .await?;
        }
        ClientEvent::EditMessage {
            message_id,
            content,
        } => {
            state.chat.edit_message(user_id, message_id, content).await?;
        }
        ClientEvent::DeleteMessage { message_id } => {
            state.chat.delete_message(user_id, message_id).await?;
        }
        ClientEvent::Typing {
            recipient_id,
            is_typing,
        } => {
            state.chat.typing(user_id, recipient_id, is_typing).await;
        }
        ClientEvent::MarkRead { message_id } => {
            state.chat.mark_read(user_id, message_id).await?;
        }
    }
    Ok(())
}
