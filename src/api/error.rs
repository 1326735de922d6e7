use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    DatabaseError(String),

    ExternalApiError { service: String, message: String },

    ValidationError(String),

    Unauthorized(String),

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::DatabaseError(msg) => write!(f, "database error: {msg}"),
            Self::ExternalApiError { service, message } => write!(f, "{service} error: {message}"),
            Self::ValidationError(msg) => write!(f, "validation error: {msg}"),
            Self::Unauthorized(msg) => write!(f, "unauthorized: {msg}"),
            Self::InternalError(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::DatabaseError(msg) => {
                tracing::error!(%msg, "database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "a database error occurred".to_string())
            }
            Self::ExternalApiError { service, message } => {
                tracing::warn!(%service, %message, "external api error");
                (StatusCode::BAD_GATEWAY, format!("{service} is unavailable"))
            }
            Self::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::InternalError(msg) => {
                tracing::error!(%msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "an internal error occurred".to_string())
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

impl From<crate::error::StoreError> for ApiError {
    fn from(err: crate::error::StoreError) -> Self {
        Self::DatabaseError(err.to_string())
    }
}

impl From<crate::error::DeletionError> for ApiError {
    fn from(err: crate::error::DeletionError) -> Self {
        Self::InternalError(err.to_string())
    }
}

impl From<crate::error::SyncError> for ApiError {
    fn from(err: crate::error::SyncError) -> Self {
        match err {
            crate::error::SyncError::Client(client_err) => Self::ExternalApiError {
                service: "media-server".to_string(),
                message: client_err.to_string(),
            },
            other => Self::InternalError(other.to_string()),
        }
    }
}

impl ApiError {
    pub fn request_not_found(id: i64) -> Self {
        Self::NotFound(format!("request {id} not found"))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }
}
