// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::session::{ReadyCause, SessionPhase};
use crate::state::AppState;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall status ("ok" or "initializing").
    pub status: String,
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Session initialization phase.
    pub session: SessionPhase,
    /// What made the session ready, once it is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready_cause: Option<ReadyCause>,
    /// Nonmember prompt setting ("enabled", "disabled" or "loading").
    pub nonmember_prompt: String,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Health check endpoint handler.
///
/// Returns 200 once the session is ready, 503 before.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Session is ready", body = ReadyResponse),
        (status = 503, description = "Session is still initializing", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let ready = state.session.is_ready();
    let nonmember_prompt = match state.prompt.get() {
        Some(true) => "enabled",
        Some(false) => "disabled",
        None => "loading",
    };

    let response = ReadyResponse {
        status: if ready { "ok" } else { "initializing" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            session: state.session.phase(),
            ready_cause: state.session.ready_cause(),
            nonmember_prompt: nonmember_prompt.to_string(),
        },
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe handler.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Session is ready", body = ReadyResponse),
        (status = 503, description = "Session is still initializing", body = ReadyResponse)
    )
)]
pub async fn readiness(state: State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    health(state).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn not_ready_before_initialization() {
        let state = AppState::default();
        let (status, Json(body)) = readiness(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "initializing");
        assert_eq!(body.checks.session, SessionPhase::Uninitialized);
        assert!(body.checks.ready_cause.is_none());
    }

    #[tokio::test]
    async fn ready_after_initialization() {
        let state = AppState::default();
        state.session.initialize().await;

        let (status, Json(body)) = health(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
        assert_eq!(body.checks.ready_cause, Some(ReadyCause::NoSession));
        assert_eq!(body.checks.nonmember_prompt, "enabled");
    }

    #[tokio::test]
    async fn liveness_always_ok() {
        assert_eq!(liveness().await.0.status, "ok");
    }
}
