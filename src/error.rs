//! Unified application error model and mapping helpers.
//! Every HTTP handler returns `AppResult<T>`; the variants carry a stable code
//! string and a client-safe message, and map onto an HTTP status and a
//! `{success:false, code, message}` envelope.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::identity::AuthError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, message: String },
    /// A single request field failed validation.
    Validation { field: String, message: String },
    NotFound { code: String, message: String },
    Conflict { code: String, message: String },
    Auth { code: String, message: String },
    Forbidden { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::Validation { .. } => "validation_error",
            AppError::UserInput { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Forbidden { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::Validation { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Forbidden { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn validation(field: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Validation { field: field.into(), message: msg.into() } }
    pub fn not_found(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn conflict(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Conflict { code: code.into(), message: msg.into() } }
    pub fn auth(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn forbidden(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Forbidden { code: code.into(), message: msg.into() } }
    pub fn internal(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Map to HTTP status code.
    ///
    /// Missing records are a client error here: callers ask for a house or
    /// client resource that has nothing stored, which is reported as 400.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UserInput { .. } => 400,
            AppError::Validation { .. } => 400,
            AppError::NotFound { .. } => 400,
            AppError::Conflict { .. } => 409,
            AppError::Auth { .. } => 401,
            AppError::Forbidden { .. } => 403,
            AppError::Internal { .. } => 500,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(app) = err.downcast_ref::<AppError>() {
            return app.clone();
        }
        tracing::error!(target: "careadmin::error", "internal error: {err:#}");
        AppError::internal("internal_error", "internal server error")
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth { code: err.code().into(), message: "authentication required".into() }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rej: JsonRejection) -> Self {
        AppError::user("invalid_body", rej.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut body = serde_json::json!({
            "success": false,
            "code": self.code_str(),
            "message": self.message(),
        });
        if let AppError::Validation { field, .. } = &self {
            body["field"] = serde_json::json!(field);
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
