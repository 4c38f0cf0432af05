// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session errors.
//!
//! Only [`AuthError`] ever reaches the view layer. Profile-store and
//! settings failures are absorbed by the orchestrator and guards and only
//! show up in logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Identity-provider failures surfaced by `login`, `signup` and `logout`.
///
/// Every variant carries a distinct, user-displayable message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Please confirm your email address before signing in")]
    EmailNotConfirmed,

    #[error("Too many attempts, please wait a moment and try again")]
    RateLimited,

    #[error("An account with this email already exists")]
    UserAlreadyExists,

    #[error("Password is too weak: {0}")]
    WeakPassword(String),

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("No active session")]
    SessionMissing,

    #[error("Authentication service is unavailable: {0}")]
    Unavailable(String),

    #[error("Authentication failed: {0}")]
    Provider(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::EmailNotConfirmed => "email_not_confirmed",
            AuthError::RateLimited => "rate_limited",
            AuthError::UserAlreadyExists => "user_already_exists",
            AuthError::WeakPassword(_) => "weak_password",
            AuthError::InvalidEmail => "invalid_email",
            AuthError::SessionMissing => "session_missing",
            AuthError::Unavailable(_) => "provider_unavailable",
            AuthError::Provider(_) => "provider_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials | AuthError::SessionMissing => StatusCode::UNAUTHORIZED,
            AuthError::EmailNotConfirmed => StatusCode::FORBIDDEN,
            AuthError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AuthError::UserAlreadyExists => StatusCode::CONFLICT,
            AuthError::WeakPassword(_) | AuthError::InvalidEmail => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AuthError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Provider(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}

/// Profile-store failures. Recovered locally by fallback synthesis.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("profile store unavailable: {0}")]
    Unavailable(String),

    #[error("profile store rejected the request: {0}")]
    Rejected(String),

    #[error("profile record was malformed: {0}")]
    Malformed(String),
}

/// Settings-source failures. The guard treats them as "prompt disabled".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("settings unavailable: {0}")]
    Unavailable(String),

    #[error("settings were malformed: {0}")]
    Malformed(String),
}
