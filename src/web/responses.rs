use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::web::{
    AppState,
    auth::session_removal_cookie,
    data::StoreError,
    storage::StorageError,
};

const TOO_MANY_REQUESTS: &str = "Too many requests from this IP, please try again later";

/// Canonical JSON payload for successful mutations.
#[derive(Debug, Serialize, Clone)]
pub struct ApiMessage {
    pub success: bool,
    pub message: String,
}

impl ApiMessage {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Request-path error. Each variant maps to one response class.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("duplicate: {0}")]
    Duplicate(String),
    /// Carries the number of seconds until the caller may retry.
    #[error("too many requests")]
    TooManyRequests(u64),
    #[error(transparent)]
    Storage(StorageError),
    #[error(transparent)]
    Database(StoreError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(vec![message.into()])
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => {
                AppError::NotFound("Resume file not found in storage".to_string())
            }
            other => AppError::Storage(other),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(field) if field == "email" => AppError::Duplicate(
                "A submission with this email address already exists".to_string(),
            ),
            StoreError::Duplicate(field) => AppError::Duplicate(format!("{field} already exists")),
            other => AppError::Database(other),
        }
    }
}

/// Server-side detail of a 500 response, surfaced only in development.
#[derive(Clone, Debug)]
pub struct ErrorDetail(pub String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(details) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Validation Error", "details": details })),
            )
                .into_response(),
            AppError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            AppError::Unauthorized => {
                let mut response =
                    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" })))
                        .into_response();
                if let Ok(value) = HeaderValue::from_str(&session_removal_cookie(false).to_string())
                {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
                response
            }
            AppError::Forbidden(message) => {
                warn!(%message, "rejected forbidden request");
                (StatusCode::FORBIDDEN, Json(json!({ "error": message }))).into_response()
            }
            AppError::Duplicate(message) => (
                StatusCode::CONFLICT,
                Json(json!({ "error": "Duplicate", "message": message })),
            )
                .into_response(),
            AppError::TooManyRequests(retry_after) => {
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({ "error": TOO_MANY_REQUESTS })),
                )
                    .into_response();
                if retry_after > 0
                    && let Ok(value) = HeaderValue::from_str(&retry_after.to_string())
                {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                response
            }
            AppError::Storage(err) => internal_response(format!("{err:?}")),
            AppError::Database(err) => internal_response(format!("{err:?}")),
            AppError::Internal(err) => internal_response(format!("{err:?}")),
        }
    }
}

fn internal_response(detail: String) -> Response {
    error!(%detail, "request failed");
    let mut response = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response();
    response.extensions_mut().insert(ErrorDetail(detail));
    response
}

/// Adds the suppressed error detail back into 500 bodies when running in development.
pub async fn expose_error_detail(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    if !state.config().is_development() {
        return response;
    }

    let Some(ErrorDetail(detail)) = response.extensions_mut().remove::<ErrorDetail>() else {
        return response;
    };

    let status = response.status();
    let body = json!({ "error": "Internal server error", "detail": detail });
    let mut rebuilt = (status, Json(body)).into_response();
    for (name, value) in response.headers() {
        if name != header::CONTENT_LENGTH && name != header::CONTENT_TYPE {
            rebuilt.headers_mut().append(name.clone(), value.clone());
        }
    }
    rebuilt
}
