use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Login entry point that clients are sent back to on authorization failures.
pub const LOGIN_REDIRECT: &str = "/auth/login";

#[derive(Debug, Display)]
pub enum AppError {
    /// Malformed input or a department/position combination outside the catalog
    #[display(fmt = "{}", _0)]
    Validation(String),

    #[display(fmt = "{} not found", _0)]
    NotFound(&'static str),

    /// No valid access token was presented
    #[display(fmt = "{}", _0)]
    Unauthorized(String),

    /// Authenticated, but the role does not allow the operation
    #[display(fmt = "{}", _0)]
    Forbidden(String),

    /// State transition from a non-pending state, or a duplicate unique value
    #[display(fmt = "{}", _0)]
    Conflict(String),

    #[display(fmt = "persistence failure: {}", _0)]
    Persistence(String),

    #[display(fmt = "internal failure: {}", _0)]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl std::error::Error for AppError {}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict(message.into())
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::Conflict(_) => "conflict",
            AppError::Persistence(_) | AppError::Internal(_) => "internal",
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "Database error");
        AppError::Persistence(e.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Persistence(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Forbidden(message) => json!({
                "error": self.kind(),
                "message": message,
                "redirect": LOGIN_REDIRECT,
            }),
            AppError::Persistence(_) | AppError::Internal(_) => json!({
                "error": self.kind(),
                "message": "Something went wrong, Contact with system admin",
            }),
            other => json!({
                "error": other.kind(),
                "message": other.to_string(),
            }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}
