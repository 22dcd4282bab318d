use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::{LoginError, RegistrationError};

/// Every failure the API reports, rendered as `{success: false, message}`.
///
/// Lookup and validation failures keep HTTP 200 so dashboard clients only
/// have to inspect `success`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Accident not found")]
    AccidentNotFound,

    #[error("POST required")]
    PostRequired,

    #[error("{0}")]
    BadRequest(String),

    #[error("Not logged in")]
    NotLoggedIn,

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Login(#[from] LoginError),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Registration(RegistrationError::Hashing(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::AccidentNotFound | ApiError::PostRequired | ApiError::Registration(_) => {
                StatusCode::OK
            }
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotLoggedIn | ApiError::Login(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(cause) => error!("Request failed: {:#}", cause),
            ApiError::Registration(RegistrationError::Hashing(cause)) => {
                error!("Password hashing failed: {}", cause)
            }
            _ => {}
        }
        let body = json!({ "success": false, "message": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
