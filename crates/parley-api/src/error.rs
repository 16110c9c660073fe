use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use parley_core::DomainError;
use parley_types::api::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("{0}")]
    BadRequest(&'static str),

    #[error("missing or invalid token")]
    Unauthorized,

    #[error("internal error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Domain(err) => match err {
                DomainError::NotFound { .. } | DomainError::NotMember { .. } => StatusCode::NOT_FOUND,
                DomainError::AlreadyMember { .. } | DomainError::AlreadyExists { .. } => {
                    StatusCode::CONFLICT
                }
                DomainError::SelfReference { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                DomainError::NotAuthorized { .. } => StatusCode::FORBIDDEN,
                DomainError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                DomainError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Domain(err) => err.kind(),
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized => "unauthorized",
            Self::Internal => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            // Store details stay in the log
            Self::Domain(DomainError::StoreUnavailable(e)) => {
                error!("Store failure: {:#}", e);
                "storage temporarily unavailable".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            kind: self.kind().to_string(),
            message,
        };
        (self.status(), Json(body)).into_response()
    }
}
