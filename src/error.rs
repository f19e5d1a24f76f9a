use serde_json::json;
use std::fmt::Display;

use anyhow::Error as anyhowError;
use axum::{http::StatusCode, response::IntoResponse};

#[derive(Debug)]
pub enum AppError {
    // 400 bad request
    BadRequest(anyhowError),
    // 401 unauthorized
    Unauthorized(anyhowError),
    // 403 forbidden
    Forbidden(anyhowError),
    // 403 forbidden, time window elapsed
    Expired(anyhowError),
    // 404 not found (also covers "exists but not yours" for calls)
    NotFound(anyhowError),
    // 500 internal server error
    InternalServerError(anyhowError),
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::BadRequest(e) => write!(f, "BadRequest: {}", e),
            AppError::Unauthorized(e) => write!(f, "Unauthorized: {}", e),
            AppError::Forbidden(e) => write!(f, "Forbidden: {}", e),
            AppError::Expired(e) => write!(f, "Expired: {}", e),
            AppError::NotFound(e) => write!(f, "NotFound: {}", e),
            AppError::InternalServerError(e) => write!(f, "InternalServerError: {}", e),
        }
    }
}

impl From<anyhowError> for AppError {
    fn from(e: anyhowError) -> Self {
        AppError::InternalServerError(e)
    }
}

impl AppError {
    /// Stable machine-readable reason, independent of the human message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "validation",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::Expired(_) => "expired",
            Self::NotFound(_) => "not_found",
            Self::InternalServerError(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) | Self::Expired(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();

        #[cfg(debug_assertions)]
        let error_response = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        });

        #[cfg(not(debug_assertions))]
        let error_response = json!({
            "error": {
                "code": self.code(),
                "message": status.canonical_reason().unwrap_or("An error occurred"),
            }
        });
        (status, axum::Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
