// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::session::{AuthError, CurrentUser, PendingUser, SessionSnapshot, SignUpMetadata};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Provider sign-out failure. Local session state was cleared anyway.
#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutFailure {
    pub error: String,
    pub error_code: String,
    pub local_session_cleared: bool,
}

#[utoipa::path(
    get,
    path = "/v1/session",
    tag = "Session",
    responses((status = 200, body = SessionSnapshot))
)]
pub async fn get_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot())
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    tag = "Session",
    responses(
        (status = 200, body = CurrentUser),
        (status = 401, description = "Invalid email or password"),
        (status = 403, description = "Email not confirmed"),
        (status = 429, description = "Too many attempts")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<CurrentUser>, AuthError> {
    let user = state.session.login(&request.email, &request.password).await?;
    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/v1/auth/signup",
    request_body = SignupRequest,
    tag = "Session",
    responses(
        (status = 201, body = PendingUser),
        (status = 409, description = "Account already exists"),
        (status = 422, description = "Invalid email or weak password")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<PendingUser>), AuthError> {
    let metadata = SignUpMetadata {
        first_name: request.first_name,
        last_name: request.last_name,
    };
    let pending = state
        .session
        .signup(&request.email, &request.password, metadata)
        .await?;
    Ok((StatusCode::CREATED, Json(pending)))
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    tag = "Session",
    responses(
        (status = 204, description = "Signed out"),
        (status = 502, description = "Provider sign-out failed; local session cleared", body = LogoutFailure)
    )
)]
pub async fn logout(State(state): State<AppState>) -> Response {
    match state.session.logout().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(LogoutFailure {
                error: e.to_string(),
                error_code: e.error_code().to_string(),
                local_session_cleared: true,
            }),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::clients::memory::{InMemoryIdentityProvider, InMemoryProfileStore};
    use crate::guards::PromptSetting;
    use crate::policy::CanonicalRole;
    use crate::session::{OrchestratorOptions, PreferenceCache, SessionOrchestrator};

    fn state_with(provider: Arc<InMemoryIdentityProvider>) -> AppState {
        let session = SessionOrchestrator::new(
            provider,
            Arc::new(InMemoryProfileStore::new()),
            PreferenceCache::default(),
            OrchestratorOptions::default(),
        );
        AppState::new(Arc::new(session), PromptSetting::loaded(false))
    }

    #[tokio::test]
    async fn login_returns_resolved_user() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        provider.register("sam@example.com", "hunter22");
        let state = state_with(provider);

        let Json(user) = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "sam@example.com".to_string(),
                password: "hunter22".to_string(),
            }),
        )
        .await
        .unwrap();

        // No stored profile: synthesized with the fallback role.
        assert_eq!(user.role, CanonicalRole::Staff);
        let Json(snapshot) = get_session(State(state)).await;
        assert!(snapshot.ready);
        assert_eq!(snapshot.user, Some(user));
    }

    #[tokio::test]
    async fn login_failure_is_typed() {
        let state = state_with(Arc::new(InMemoryIdentityProvider::new()));
        let result = login(
            State(state),
            Json(LoginRequest {
                email: "ghost@example.com".to_string(),
                password: "nope".to_string(),
            }),
        )
        .await;
        assert_eq!(result.unwrap_err(), AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn signup_returns_created() {
        let state = state_with(Arc::new(InMemoryIdentityProvider::new()));
        let (status, Json(pending)) = signup(
            State(state),
            Json(SignupRequest {
                email: "river@example.com".to_string(),
                password: "hunter22".to_string(),
                first_name: Some("River".to_string()),
                last_name: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(pending.email, "river@example.com");
    }

    #[tokio::test]
    async fn logout_reports_provider_failure_as_bad_gateway() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        provider.register("sam@example.com", "hunter22");
        provider.fail_sign_out(true);
        let state = state_with(provider);
        state.session.login("sam@example.com", "hunter22").await.unwrap();

        let response = logout(State(state.clone())).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(state.session.current_user().is_none());
    }

    #[tokio::test]
    async fn logout_success_is_no_content() {
        let state = state_with(Arc::new(InMemoryIdentityProvider::new()));
        let response = logout(State(state)).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
