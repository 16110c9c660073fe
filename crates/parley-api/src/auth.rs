use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{error, warn};

use parley_core::{DomainError, Messenger};
use parley_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest, SetStatusRequest};
use parley_types::models::Session;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub messenger: Messenger,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
}

/// Run a store-bound call off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Messenger) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.messenger))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    if req.login.len() < 3 || req.login.len() > 32 {
        return Err(ApiError::BadRequest("login must be 3 to 32 characters"));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest("password must be at least 8 characters"));
    }
    if req.phone.trim().is_empty() {
        return Err(ApiError::BadRequest("phone number is required"));
    }

    let user = blocking(&state, move |m| {
        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| {
                error!("Password hashing failed: {}", e);
                ApiError::Internal
            })?
            .to_string();

        Ok(m.register(&req.login, req.phone.trim(), &password_hash)?)
    })
    .await?;

    let token = create_token(&state, &user.login)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            login: user.login,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let login = req.login.clone();
    blocking(&state, move |m| {
        // Unknown logins and wrong passwords look the same to the caller
        let stored = match m.credential_for(&req.login) {
            Ok(stored) => stored,
            Err(DomainError::NotFound { .. }) => return Err(DomainError::InvalidCredentials.into()),
            Err(e) => return Err(e.into()),
        };

        let parsed_hash = PasswordHash::new(&stored).map_err(|e| {
            error!("Stored hash for {} is unreadable: {}", req.login, e);
            ApiError::Internal
        })?;

        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| {
                warn!("Failed login for {}", req.login);
                ApiError::from(DomainError::InvalidCredentials)
            })
    })
    .await?;

    let token = create_token(&state, &login)?;
    Ok(Json(AuthResponse { login, token }))
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let user = blocking(&state, move |m| Ok(m.profile(&session)?)).await?;
    Ok(Json(user))
}

pub async fn set_status(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<SetStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |m| Ok(m.set_status(&session, req.status.as_deref())?)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_account(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |m| Ok(m.delete_account(&session)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn create_token(state: &AppStateInner, login: &str) -> Result<String, ApiError> {
    let claims = Claims {
        sub: login.to_string(),
        exp: (chrono::Utc::now() + state.token_ttl).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )
    .map_err(|e| {
        error!("Token encoding failed: {}", e);
        ApiError::Internal
    })
}
