//! Error type shared by every handler.
//!
//! Domain failures carry the message the client sees; anything unexpected is
//! logged here and surfaced as a bare "Server error".

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

/// One violated field constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub param: String,
    pub msg: String,
}

impl FieldError {
    pub fn new(param: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            msg: msg.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("malformed request body: {0}")]
    MalformedBody(#[from] JsonRejection),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("Invalid Credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("No Github profile found")]
    GithubNotFound,

    #[error("upstream request failed: {0}")]
    Upstream(#[source] anyhow::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmailTaken => AppError::Conflict("User already exists"),
            StoreError::Backend(e) => AppError::Internal(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
            }
            AppError::MalformedBody(rejection) => (
                rejection.status(),
                Json(json!({ "msg": rejection.body_text() })),
            )
                .into_response(),
            AppError::Conflict(msg) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "errors": [{ "msg": msg }] })),
            )
                .into_response(),
            AppError::InvalidCredentials => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "errors": [{ "msg": "Invalid Credentials" }] })),
            )
                .into_response(),
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "msg": msg }))).into_response()
            }
            AppError::NotFound(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "msg": msg }))).into_response()
            }
            AppError::GithubNotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "msg": "No Github profile found" })),
            )
                .into_response(),
            AppError::Upstream(e) | AppError::Internal(e) => {
                error!(error = %e, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "msg": "Server error" })),
                )
                    .into_response()
            }
        }
    }
}
