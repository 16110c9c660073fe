use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use parley_types::models::{ListKind, Session, UserRef};

use crate::auth::{AppState, blocking};
use crate::error::ApiError;

pub async fn get_list(
    State(state): State<AppState>,
    Path(kind): Path<ListKind>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let members = blocking(&state, move |m| Ok(m.list(&session, kind)?)).await?;
    Ok(Json(members))
}

/// Body is either `{"login": "..."}` or `{"phone": "..."}`.
pub async fn add_to_list(
    State(state): State<AppState>,
    Path(kind): Path<ListKind>,
    Extension(session): Extension<Session>,
    Json(candidate): Json<UserRef>,
) -> Result<impl IntoResponse, ApiError> {
    let login = blocking(&state, move |m| Ok(m.add_to_list(&session, kind, &candidate)?)).await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "login": login }))))
}

pub async fn remove_from_list(
    State(state): State<AppState>,
    Path((kind, login)): Path<(ListKind, String)>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |m| {
        Ok(m.remove_from_list(&session, kind, &UserRef::Login(login))?)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
