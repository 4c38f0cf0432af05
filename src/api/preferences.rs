// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client-side preference state for the signed-in user.
//!
//! Values are arbitrary JSON. The cache is emptied on sign-out, so every
//! endpoint requires a signed-in user.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::error::ApiError;
use crate::session::AuthError;
use crate::state::AppState;

fn require_user(state: &AppState) -> Result<(), ApiError> {
    if !state.session.is_ready() {
        return Err(ApiError::not_ready());
    }
    match state.session.current_user() {
        Some(_) => Ok(()),
        None => Err(AuthError::SessionMissing.into()),
    }
}

#[utoipa::path(
    get,
    path = "/v1/preferences/{key}",
    params(("key" = String, Path, description = "Preference key")),
    tag = "Preferences",
    responses(
        (status = 200, body = serde_json::Value),
        (status = 401, description = "No signed-in user"),
        (status = 404, description = "No value stored under this key"),
        (status = 503, description = "Session is still initializing")
    )
)]
pub async fn get_preference(
    Path(key): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    require_user(&state)?;
    state
        .session
        .preferences()
        .get(&key)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("No preference stored for {key}")))
}

#[utoipa::path(
    put,
    path = "/v1/preferences/{key}",
    params(("key" = String, Path, description = "Preference key")),
    request_body = serde_json::Value,
    tag = "Preferences",
    responses(
        (status = 204, description = "Stored"),
        (status = 401, description = "No signed-in user")
    )
)]
pub async fn put_preference(
    Path(key): Path<String>,
    State(state): State<AppState>,
    Json(value): Json<Value>,
) -> Result<StatusCode, ApiError> {
    require_user(&state)?;
    state.session.preferences().put(key, value);
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/v1/preferences/{key}",
    params(("key" = String, Path, description = "Preference key")),
    tag = "Preferences",
    responses(
        (status = 204, description = "Removed"),
        (status = 401, description = "No signed-in user"),
        (status = 404, description = "No value stored under this key")
    )
)]
pub async fn delete_preference(
    Path(key): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    require_user(&state)?;
    match state.session.preferences().remove(&key) {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(ApiError::not_found(format!("No preference stored for {key}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::clients::memory::{InMemoryIdentityProvider, InMemoryProfileStore};
    use crate::guards::PromptSetting;
    use crate::session::{OrchestratorOptions, PreferenceCache, SessionOrchestrator};
    use serde_json::json;

    async fn signed_in_state() -> AppState {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        provider.register("sam@example.com", "hunter22");
        let session = SessionOrchestrator::new(
            provider,
            Arc::new(InMemoryProfileStore::new()),
            PreferenceCache::new(8),
            OrchestratorOptions::default(),
        );
        let state = AppState::new(Arc::new(session), PromptSetting::loaded(true));
        state.session.initialize().await;
        state.session.login("sam@example.com", "hunter22").await.unwrap();
        state
    }

    #[tokio::test]
    async fn unavailable_until_session_is_ready() {
        let state = AppState::default();
        let response = get_preference(Path("theme".to_string()), State(state))
            .await
            .unwrap_err();
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.code, "session_initializing");
    }

    #[tokio::test]
    async fn requires_signed_in_user() {
        let state = AppState::default();
        state.session.initialize().await;
        let response = get_preference(Path("theme".to_string()), State(state))
            .await
            .unwrap_err();
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.code, "session_missing");
    }

    #[tokio::test]
    async fn put_get_delete() {
        let state = signed_in_state().await;

        let status = put_preference(
            Path("calendar".to_string()),
            State(state.clone()),
            Json(json!({"view": "week"})),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let Json(value) = get_preference(Path("calendar".to_string()), State(state.clone()))
            .await
            .unwrap();
        assert_eq!(value, json!({"view": "week"}));

        let status = delete_preference(Path("calendar".to_string()), State(state.clone()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let missing = get_preference(Path("calendar".to_string()), State(state))
            .await
            .unwrap_err();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn logout_empties_preferences() {
        let state = signed_in_state().await;
        put_preference(Path("theme".to_string()), State(state.clone()), Json(json!("dark")))
            .await
            .unwrap();

        state.session.logout().await.unwrap();
        assert!(state.session.preferences().is_empty());
    }
}
