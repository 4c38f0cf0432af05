// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::guards::{AuthenticatedGuard, GuardDecision, PublicGuard};
use crate::policy::CanonicalRole;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AuthenticatedGuardRequest {
    /// Location the view layer is about to render, e.g. `/admin/members?page=2`.
    pub route: String,
    /// Canonical roles allowed on this screen; empty means any role.
    #[serde(default)]
    pub required_roles: Vec<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PublicGuardRequest {
    /// Location preserved by an earlier redirect to login.
    #[serde(default)]
    pub from: Option<String>,
}

#[utoipa::path(
    post,
    path = "/v1/guards/authenticated",
    request_body = AuthenticatedGuardRequest,
    tag = "Guards",
    responses(
        (status = 200, body = GuardDecision),
        (status = 400, description = "Malformed route or unknown role in allow-list")
    )
)]
pub async fn check_authenticated(
    State(state): State<AppState>,
    Json(request): Json<AuthenticatedGuardRequest>,
) -> Result<Json<GuardDecision>, ApiError> {
    if !request.route.starts_with('/') {
        return Err(ApiError::bad_request("route must start with '/'"));
    }

    let required = request
        .required_roles
        .iter()
        .map(|raw| {
            CanonicalRole::parse(raw)
                .ok_or_else(|| ApiError::bad_request(format!("unknown role in allow-list: {raw}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let guard = AuthenticatedGuard::new().with_required_roles(required);
    let decision = guard.check(&request.route, &state.session.snapshot(), state.prompt.get());
    Ok(Json(decision))
}

#[utoipa::path(
    post,
    path = "/v1/guards/public",
    request_body = PublicGuardRequest,
    tag = "Guards",
    responses((status = 200, body = GuardDecision))
)]
pub async fn check_public(
    State(state): State<AppState>,
    Json(request): Json<PublicGuardRequest>,
) -> Json<GuardDecision> {
    Json(PublicGuard.check(request.from.as_deref(), &state.session.snapshot()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::clients::memory::{InMemoryIdentityProvider, InMemoryProfileStore};
    use crate::guards::{PromptSetting, RedirectReason};
    use crate::session::{OrchestratorOptions, PreferenceCache, SessionOrchestrator, UserProfile};
    use axum::http::StatusCode;

    fn request(route: &str, roles: &[&str]) -> Json<AuthenticatedGuardRequest> {
        Json(AuthenticatedGuardRequest {
            route: route.to_string(),
            required_roles: roles.iter().map(|r| r.to_string()).collect(),
        })
    }

    #[tokio::test]
    async fn loading_before_initialization() {
        let state = AppState::default();
        let Json(decision) = check_authenticated(State(state), request("/dashboard", &[]))
            .await
            .unwrap();
        assert_eq!(decision, GuardDecision::Loading);
    }

    #[tokio::test]
    async fn anonymous_user_is_sent_to_login() {
        let state = AppState::default();
        state.session.initialize().await;

        let Json(decision) = check_authenticated(State(state), request("/admin/members", &[]))
            .await
            .unwrap();
        assert_eq!(decision, GuardDecision::redirect_to_login("/admin/members"));
    }

    #[tokio::test]
    async fn unknown_allow_list_role_is_rejected() {
        let state = AppState::default();
        let err = check_authenticated(State(state), request("/staff", &["wizard"]))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn relative_route_is_rejected() {
        let state = AppState::default();
        let err = check_authenticated(State(state), request("dashboard", &[]))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn public_guard_renders_for_anonymous_user() {
        let state = AppState::default();
        state.session.initialize().await;

        let Json(decision) = check_public(State(state), Json(PublicGuardRequest::default())).await;
        assert_eq!(decision, GuardDecision::Render);
    }

    #[tokio::test]
    async fn signed_in_member_is_redirected_from_public_screens() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let store = Arc::new(InMemoryProfileStore::new());
        let id = provider.register("sam@example.com", "hunter22");
        store.seed(UserProfile {
            id,
            email: Some("sam@example.com".to_string()),
            role: Some("member".to_string()),
            status: Some("active".to_string()),
            first_name: None,
            last_name: None,
            created_at: None,
        });
        let session = SessionOrchestrator::new(
            provider,
            store,
            PreferenceCache::default(),
            OrchestratorOptions::default(),
        );
        let state = AppState::new(Arc::new(session), PromptSetting::loaded(true));
        state.session.login("sam@example.com", "hunter22").await.unwrap();

        let Json(decision) = check_public(State(state.clone()), Json(PublicGuardRequest::default())).await;
        assert_eq!(
            decision,
            GuardDecision::redirect("/member/dashboard", RedirectReason::AlreadyAuthenticated)
        );

        let Json(decision) = check_authenticated(State(state), request("/bookings/42", &["member", "staff"]))
            .await
            .unwrap();
        assert_eq!(decision, GuardDecision::Render);
    }
}
