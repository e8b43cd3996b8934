use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Which half of a login check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFailure {
    UnknownEmail,
    WrongPassword,
}

impl LoginFailure {
    pub fn message(self) -> &'static str {
        match self {
            LoginFailure::UnknownEmail => "no user with that email",
            LoginFailure::WrongPassword => "invalid credentials",
        }
    }
}

/// Outcomes of the register and login use cases that are not a success.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("email is already registered")]
    DuplicateEmail,
    #[error("{}", .0.message())]
    InvalidCredentials(LoginFailure),
    #[error("could not register the user")]
    NotRegistered,
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AuthError::DuplicateEmail
            | AuthError::InvalidCredentials(_)
            | AuthError::NotRegistered => StatusCode::BAD_REQUEST,
            AuthError::Persistence(_) | AuthError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        AuthError::Persistence(e.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = if status.is_server_error() {
            error!(error = ?self, "request failed");
            "internal server error".to_string()
        } else {
            warn!(%status, reason = %self, "request rejected");
            self.to_string()
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
