//! HTTP-facing error type.
//!
//! Every failure leaves the server as `{"error": "<message>"}` with a status
//! chosen from the domain error it wraps.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::audio::AudioError;
use crate::backend::BackendError;
use crate::chat::ChatError;
use crate::explorer::NavigationError;
use crate::reference::ReferenceError;
use crate::search::SearchError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.status)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// 404 from the backend stays a 404; everything else is a bad gateway.
fn upstream_status(err: &BackendError) -> StatusCode {
    match err.status() {
        Some(404) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        Self::new(upstream_status(&err), err.to_string())
    }
}

// Extractor rejections keep axum's status and text but use the JSON body.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<ReferenceError> for AppError {
    fn from(err: ReferenceError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        let status = match &err {
            SearchError::EmptyQuery => StatusCode::BAD_REQUEST,
            SearchError::Remote(_) | SearchError::SearchFailed(_) | SearchError::RandomFailed(_) => {
                StatusCode::BAD_GATEWAY
            }
        };
        Self::new(status, err.to_string())
    }
}

impl From<NavigationError> for AppError {
    fn from(err: NavigationError) -> Self {
        let status = match &err {
            NavigationError::UnknownHymn { .. } => StatusCode::NOT_FOUND,
            NavigationError::IndexUnavailable(source) | NavigationError::FetchFailed(source) => {
                upstream_status(source)
            }
            e if e.is_user_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, err.to_string())
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        let status = match &err {
            ChatError::EmptyMessage => StatusCode::BAD_REQUEST,
            ChatError::Remote(_) | ChatError::Failed(_) => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, err.to_string())
    }
}

impl From<AudioError> for AppError {
    fn from(err: AudioError) -> Self {
        let status = match &err {
            AudioError::Unavailable(_) => StatusCode::NOT_FOUND,
            AudioError::LoadFailed { source, .. } => upstream_status(source),
        };
        Self::new(status, err.to_string())
    }
}
