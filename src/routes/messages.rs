//! HTTP mirror of the conversation operations, for clients without an
//! active live connection. Handlers delegate to the same chat service the
//! socket protocol uses, so mutations made over HTTP still reach the other
//! party's live connections.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{resolve_caller, AuthUser};
use crate::models::message::{ConversationSummary, Message};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub sender_id: Option<Uuid>,
    pub receiver_id: Option<Uuid>,
    #[serde(default)]
    pub content: Option<String>,
    pub attachment_url: Option<String>,
}

pub async fn send_message(
    State(state): State<AppState>,
    auth: Option<Extension<AuthUser>>,
    Json(body): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<Message>)> {
    let receiver_id = body
        .receiver_id
        .ok_or_else(|| AppError::Validation("receiverId is required".into()))?;
    let sender_id = resolve_caller(auth.map(|Extension(u)| u), body.sender_id)?;
    let message = state
        .chat
        .send_message(
            sender_id,
            receiver_id,
            body.content.unwrap_or_default(),
            body.attachment_url,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationQuery {
    pub current_user_id: Option<Uuid>,
}

pub async fn get_conversation(
    State(state): State<AppState>,
    Path(other_user_id): Path<Uuid>,
    auth: Option<Extension<AuthUser>>,
    Query(q): Query<ConversationQuery>,
) -> AppResult<Json<Vec<Message>>> {
    let current = resolve_caller(auth.map(|Extension(u)| u), q.current_user_id)?;
    Ok(Json(state.chat.conversation(current, other_user_id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerQuery {
    pub user_id: Option<Uuid>,
}

pub async fn get_conversations(
    State(state): State<AppState>,
    auth: Option<Extension<AuthUser>>,
    Query(q): Query<CallerQuery>,
) -> AppResult<Json<Vec<ConversationSummary>>> {
    let user_id = resolve_caller(auth.map(|Extension(u)| u), q.user_id)?;
    Ok(Json(state.chat.conversations_for(user_id).await?))
}

pub async fn get_unread(
    State(state): State<AppState>,
    auth: Option<Extension<AuthUser>>,
    Query(q): Query<CallerQuery>,
) -> AppResult<Json<Vec<Message>>> {
    let user_id = resolve_caller(auth.map(|Extension(u)| u), q.user_id)?;
    Ok(Json(state.chat.unread_for(user_id).await?))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth: Option<Extension<AuthUser>>,
    Query(q): Query<CallerQuery>,
) -> AppResult<Json<Message>> {
    let reader = resolve_caller(auth.map(|Extension(u)| u), q.user_id)?;
    Ok(Json(state.chat.mark_read(reader, id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditMessageRequest {
    pub content: Option<String>,
    pub user_id: Option<Uuid>,
}

pub async fn edit_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth: Option<Extension<AuthUser>>,
    Json(body): Json<EditMessageRequest>,
) -> AppResult<Json<Message>> {
    let content = body
        .content
        .ok_or_else(|| AppError::Validation("content is required".into()))?;
    let editor = resolve_caller(auth.map(|Extension(u)| u), body.user_id)?;
    Ok(Json(state.chat.edit_message(editor, id, content).await?))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth: Option<Extension<AuthUser>>,
    Query(q): Query<CallerQuery>,
) -> AppResult<StatusCode> {
    let requester = resolve_caller(auth.map(|Extension(u)| u), q.user_id)?;
    state.chat.delete_message(requester, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
