use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use parley_types::api::{
    EditMessageRequest, HistoryResponse, MessageCreatedResponse, SendMessageRequest,
};
use parley_types::models::{DEFAULT_WINDOW_SIZE, MessageWindow, Session};

use crate::auth::{AppState, blocking};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Messages to skip, counted from the newest.
    #[serde(default)]
    pub offset: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_WINDOW_SIZE
}

/// Opening a chat's history also purges its expired messages and marks the
/// caller's notifications for it as read.
pub async fn get_messages(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Query(query): Query<HistoryQuery>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let window = MessageWindow::new(query.offset, query.limit);
    let page = blocking(&state, move |m| Ok(m.open_chat(&session, chat_id, window)?)).await?;
    Ok(Json(HistoryResponse::from(page)))
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Extension(session): Extension<Session>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.body.trim().is_empty() && req.media.is_none() {
        return Err(ApiError::BadRequest("message needs a body or an attachment"));
    }

    let message_id = blocking(&state, move |m| Ok(m.send_message(&session, chat_id, &req)?)).await?;
    Ok((StatusCode::CREATED, Json(MessageCreatedResponse { message_id })))
}

pub async fn edit_message(
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
    Extension(session): Extension<Session>,
    Json(req): Json<EditMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.body.trim().is_empty() {
        return Err(ApiError::BadRequest("message body cannot be empty"));
    }

    blocking(&state, move |m| Ok(m.edit_message(&session, message_id, &req.body)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_message(
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |m| Ok(m.delete_message(&session, message_id)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn notifications(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let pending = blocking(&state, move |m| Ok(m.notifications(&session)?)).await?;
    Ok(Json(pending))
}
