use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use parley_types::api::{AddChatMemberRequest, ChatCreatedResponse};
use parley_types::models::Session;

use crate::auth::{AppState, blocking};
use crate::error::ApiError;

pub async fn list_chats(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let chats = blocking(&state, move |m| Ok(m.chats(&session)?)).await?;
    Ok(Json(chats))
}

pub async fn create_chat(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let chat_id = blocking(&state, move |m| Ok(m.create_chat(&session)?)).await?;
    Ok((StatusCode::CREATED, Json(ChatCreatedResponse { chat_id })))
}

pub async fn delete_chat(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |m| Ok(m.delete_chat(&session, chat_id)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_members(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let members = blocking(&state, move |m| Ok(m.chat_members(&session, chat_id)?)).await?;
    Ok(Json(members))
}

pub async fn add_member(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Extension(session): Extension<Session>,
    Json(req): Json<AddChatMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |m| Ok(m.add_chat_member(&session, chat_id, &req.login)?)).await?;
    Ok(StatusCode::CREATED)
}

pub async fn remove_member(
    State(state): State<AppState>,
    Path((chat_id, login)): Path<(i64, String)>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |m| Ok(m.remove_chat_member(&session, chat_id, &login)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn administered_chats(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let chats = blocking(&state, move |m| Ok(m.administered_chats(&session)?)).await?;
    Ok(Json(chats))
}
