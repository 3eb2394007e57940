//! API error types with IntoResponse
//!
//! Every error becomes `{"error": <code>, "message": <text>}`. Server-side
//! failures are logged and answered with a generic message.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::{PasswordError, TokenError};
use crate::db::repos::DbError;
use crate::models::ValidationError;

const SERVER_ERROR: &str = "Server error";

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Validation failed (400)
    Validation(ValidationError),

    /// Request understood but refused, e.g. duplicate email (400)
    BadRequest { message: &'static str },

    /// Body or query string could not be decoded (400)
    Malformed { message: String },

    /// Missing, invalid, or stale bearer token (401)
    Unauthorized,

    /// Resource not found (404)
    NotFound { message: String },

    /// Database error (500, logged)
    Database(DbError),

    /// Internal error (500, logged)
    Internal { message: String },
}

impl ApiError {
    pub const INVALID_CREDENTIALS: Self = Self::BadRequest {
        message: "Invalid credentials",
    };

    pub const USER_EXISTS: Self = Self::BadRequest {
        message: "User already exists",
    };

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest { .. } | Self::Malformed { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Validation(e) => {
                tracing::debug!(field = e.field(), "request validation failed");
                json!({
                    "error": "validation_error",
                    "message": e.to_string()
                })
            }
            Self::Malformed { message } => json!({
                "error": "invalid_request",
                "message": message
            }),
            Self::BadRequest { message } => json!({
                "error": "bad_request",
                "message": message
            }),
            Self::Unauthorized => json!({
                "error": "unauthorized",
                "message": "Not authorized"
            }),
            Self::NotFound { message } => json!({
                "error": "not_found",
                "message": message
            }),
            Self::Database(e) => {
                tracing::error!("Database error: {}", e);
                json!({
                    "error": "internal_error",
                    "message": SERVER_ERROR
                })
            }
            Self::Internal { message } => {
                tracing::error!("Internal error: {}", message);
                json!({
                    "error": "internal_error",
                    "message": SERVER_ERROR
                })
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::Malformed {
            message: e.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self::Malformed {
            message: e.body_text(),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { resource, id } => Self::NotFound {
                message: format!("{} '{}' not found", resource, id),
            },
            DbError::Conflict { resource: "user" } => Self::USER_EXISTS,
            _ => Self::Database(e),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(e: PasswordError) -> Self {
        Self::Internal {
            message: e.to_string(),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Sign(_) => Self::Internal {
                message: e.to_string(),
            },
            _ => Self::Unauthorized,
        }
    }
}
