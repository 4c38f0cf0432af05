// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! REST collaborators.
//!
//! - [`HttpIdentityProvider`]: GoTrue-style identity service
//!   (`/token`, `/signup`, `/logout`, `/user`)
//! - [`HttpProfileStore`]: PostgREST-style `profiles` table
//! - [`HttpSettingsSource`]: PostgREST-style `general_settings` table
//!
//! The identity client keeps the signed-in session in process and emits the
//! matching change notifications itself, since a REST service has no push
//! channel.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Duration;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::ServiceEndpoint;
use crate::session::{
    AuthError, GeneralSettings, IdentityProvider, PendingUser, ProfileError, ProfilePatch,
    ProfileStore, Session, SessionChange, SettingsError, SettingsSource, SignUpMetadata,
    UserProfile,
};

const EVENT_CHANNEL_CAPACITY: usize = 32;
const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

// =============================================================================
// Identity provider
// =============================================================================

#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_confirmed_at: Option<String>,
    #[serde(default)]
    confirmed_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: ProviderUser,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let ttl = Duration::seconds(self.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS));
        let mut session = Session::new(self.user.id, self.user.email, self.access_token, ttl);
        session.refresh_token = self.refresh_token;
        session
    }
}

/// `/signup` answers with either a bare user (confirmation pending) or a
/// full token response (auto-confirmed).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(ProviderUser),
}

impl SignUpResponse {
    fn into_pending(self, requested_email: &str) -> PendingUser {
        let (user, confirmation_required) = match self {
            SignUpResponse::Session(token) => (token.user, false),
            SignUpResponse::User(user) => {
                let confirmed = user.email_confirmed_at.is_some() || user.confirmed_at.is_some();
                (user, !confirmed)
            }
        };
        PendingUser {
            email: user.email.unwrap_or_else(|| requested_email.to_string()),
            id: user.id,
            confirmation_required,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ProviderErrorBody {
    fn text(&self) -> Option<&str> {
        self.error_description
            .as_deref()
            .or(self.msg.as_deref())
            .or(self.message.as_deref())
    }
}

/// Map an identity-service error response to a distinct [`AuthError`].
///
/// The error code wins when present; older deployments only send a
/// message, so well-known message texts are recognized too.
pub fn map_provider_error(status: StatusCode, body: &str) -> AuthError {
    let parsed: ProviderErrorBody = serde_json::from_str(body).unwrap_or_default();
    let text = parsed
        .text()
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string());

    if status == StatusCode::TOO_MANY_REQUESTS {
        return AuthError::RateLimited;
    }

    if let Some(code) = parsed.error_code.as_deref() {
        match code {
            "invalid_credentials" => return AuthError::InvalidCredentials,
            "email_not_confirmed" => return AuthError::EmailNotConfirmed,
            "over_request_rate_limit" | "over_email_send_rate_limit" => {
                return AuthError::RateLimited
            }
            "user_already_exists" | "email_exists" => return AuthError::UserAlreadyExists,
            "weak_password" => return AuthError::WeakPassword(text),
            "email_address_invalid" | "validation_failed" => return AuthError::InvalidEmail,
            "session_not_found" | "bad_jwt" | "no_authorization" => {
                return AuthError::SessionMissing
            }
            _ => {}
        }
    }

    let lowered = text.to_lowercase();
    if lowered.contains("invalid login credentials") || parsed.error.as_deref() == Some("invalid_grant")
    {
        if lowered.contains("email not confirmed") {
            return AuthError::EmailNotConfirmed;
        }
        return AuthError::InvalidCredentials;
    }
    if lowered.contains("email not confirmed") {
        return AuthError::EmailNotConfirmed;
    }
    if lowered.contains("already registered") || lowered.contains("already exists") {
        return AuthError::UserAlreadyExists;
    }
    if lowered.contains("password should") || lowered.contains("weak password") {
        return AuthError::WeakPassword(text);
    }

    if status.is_server_error() {
        AuthError::Unavailable(format!("{status}: {text}"))
    } else {
        AuthError::Provider(format!("{status}: {text}"))
    }
}

fn transport_error(action: &str, e: reqwest::Error) -> AuthError {
    AuthError::Unavailable(format!("{action} failed: {e}"))
}

fn invalid_response(action: &str, e: reqwest::Error) -> AuthError {
    AuthError::Provider(format!("{action} returned an invalid response: {e}"))
}

async fn provider_failure(response: Response) -> AuthError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    map_provider_error(status, &body)
}

pub struct HttpIdentityProvider {
    endpoint: ServiceEndpoint,
    http: Client,
    session: Mutex<Option<Session>>,
    events: broadcast::Sender<SessionChange>,
}

impl HttpIdentityProvider {
    pub fn new(endpoint: ServiceEndpoint, http: Client) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            endpoint,
            http,
            session: Mutex::new(None),
            events,
        }
    }

    fn stored(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, change: SessionChange) {
        let _ = self.events.send(change);
    }

    fn endpoint_url(&self, path: &str) -> Result<url::Url, AuthError> {
        self.endpoint
            .url(path)
            .map_err(|e| AuthError::Provider(format!("invalid identity URL for {path}: {e}")))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let url = self.endpoint_url("token?grant_type=refresh_token")?;
        let response = self
            .endpoint
            .authorize(self.http.post(url), None)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| transport_error("token refresh", e))?;

        if !response.status().is_success() {
            return Err(provider_failure(response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| invalid_response("token refresh", e))?;
        Ok(token.into_session())
    }

    /// Check the access token with `GET /user`. `Ok(false)` means the
    /// service no longer recognizes it.
    async fn validate(&self, session: &Session) -> Result<bool, AuthError> {
        let url = self.endpoint_url("user")?;
        let response = self
            .endpoint
            .authorize(self.http.get(url), Some(&session.access_token))
            .send()
            .await
            .map_err(|e| transport_error("session check", e))?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(false),
            _ => Err(provider_failure(response).await),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        let Some(mut session) = self.stored().clone() else {
            return Ok(None);
        };

        if session.is_expired() {
            let Some(refresh_token) = session.refresh_token.clone() else {
                debug!(user_id = %session.user_id, "Stored session expired without refresh token");
                *self.stored() = None;
                return Ok(None);
            };
            session = self.refresh(&refresh_token).await?;
            *self.stored() = Some(session.clone());
            self.emit(SessionChange::token_refreshed(session.clone()));
        }

        if self.validate(&session).await? {
            Ok(Some(session))
        } else {
            warn!(user_id = %session.user_id, "Identity service rejected stored session");
            *self.stored() = None;
            Ok(None)
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let url = self.endpoint_url("token?grant_type=password")?;
        let response = self
            .endpoint
            .authorize(self.http.post(url), None)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| transport_error("sign-in", e))?;

        if !response.status().is_success() {
            return Err(provider_failure(response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| invalid_response("sign-in", e))?;
        let session = token.into_session();

        *self.stored() = Some(session.clone());
        self.emit(SessionChange::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: SignUpMetadata,
    ) -> Result<PendingUser, AuthError> {
        let url = self.endpoint_url("signup")?;
        let response = self
            .endpoint
            .authorize(self.http.post(url), None)
            .json(&json!({
                "email": email,
                "password": password,
                "data": metadata,
            }))
            .send()
            .await
            .map_err(|e| transport_error("sign-up", e))?;

        if !response.status().is_success() {
            return Err(provider_failure(response).await);
        }

        let created: SignUpResponse = response
            .json()
            .await
            .map_err(|e| invalid_response("sign-up", e))?;
        // Sign-up never signs the user in here, even if the service
        // returned tokens for an auto-confirmed account.
        Ok(created.into_pending(email))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let Some(session) = self.stored().clone() else {
            self.emit(SessionChange::signed_out());
            return Ok(());
        };

        let url = self.endpoint_url("logout")?;
        let response = self
            .endpoint
            .authorize(self.http.post(url), Some(&session.access_token))
            .send()
            .await
            .map_err(|e| transport_error("sign-out", e))?;

        // An already-invalid token is as good as signed out.
        let status = response.status();
        if !status.is_success() && status != StatusCode::UNAUTHORIZED {
            return Err(provider_failure(response).await);
        }

        *self.stored() = None;
        self.emit(SessionChange::signed_out());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.events.subscribe()
    }
}

// =============================================================================
// Profile store
// =============================================================================

fn profile_transport(action: &str, e: reqwest::Error) -> ProfileError {
    ProfileError::Unavailable(format!("{action} failed: {e}"))
}

async fn profile_failure(action: &str, response: Response) -> ProfileError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if status.is_server_error() {
        ProfileError::Unavailable(format!("{action} returned {status}: {body}"))
    } else {
        ProfileError::Rejected(format!("{action} returned {status}: {body}"))
    }
}

pub struct HttpProfileStore {
    endpoint: ServiceEndpoint,
    http: Client,
}

impl HttpProfileStore {
    pub fn new(endpoint: ServiceEndpoint, http: Client) -> Self {
        Self { endpoint, http }
    }

    fn profiles_url(&self, id: Option<&str>) -> Result<url::Url, ProfileError> {
        let mut url = self
            .endpoint
            .url("profiles")
            .map_err(|e| ProfileError::Unavailable(format!("invalid profile store URL: {e}")))?;
        if let Some(id) = id {
            url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));
        }
        Ok(url)
    }
}

#[async_trait]
impl ProfileStore for HttpProfileStore {
    async fn get_profile(&self, id: &str) -> Result<Option<UserProfile>, ProfileError> {
        let mut url = self.profiles_url(Some(id))?;
        url.query_pairs_mut().append_pair("select", "*");

        let response = self
            .endpoint
            .authorize(self.http.get(url), None)
            .send()
            .await
            .map_err(|e| profile_transport("profile lookup", e))?;

        if !response.status().is_success() {
            return Err(profile_failure("profile lookup", response).await);
        }

        let rows: Vec<UserProfile> = response
            .json()
            .await
            .map_err(|e| ProfileError::Malformed(e.to_string()))?;
        Ok(rows.into_iter().next())
    }

    async fn insert_profile(&self, profile: &UserProfile) -> Result<(), ProfileError> {
        let url = self.profiles_url(None)?;
        let response = self
            .endpoint
            .authorize(self.http.post(url), None)
            .header("Prefer", "return=minimal")
            .json(profile)
            .send()
            .await
            .map_err(|e| profile_transport("profile insert", e))?;

        if !response.status().is_success() {
            return Err(profile_failure("profile insert", response).await);
        }
        Ok(())
    }

    async fn update_profile(&self, id: &str, patch: &ProfilePatch) -> Result<(), ProfileError> {
        let url = self.profiles_url(Some(id))?;
        let response = self
            .endpoint
            .authorize(self.http.patch(url), None)
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()
            .await
            .map_err(|e| profile_transport("profile update", e))?;

        if !response.status().is_success() {
            return Err(profile_failure("profile update", response).await);
        }
        Ok(())
    }
}

// =============================================================================
// Settings
// =============================================================================

pub struct HttpSettingsSource {
    endpoint: ServiceEndpoint,
    http: Client,
}

impl HttpSettingsSource {
    pub fn new(endpoint: ServiceEndpoint, http: Client) -> Self {
        Self { endpoint, http }
    }
}

#[async_trait]
impl SettingsSource for HttpSettingsSource {
    async fn general_settings(&self) -> Result<GeneralSettings, SettingsError> {
        let url = self
            .endpoint
            .url("general_settings?select=*&limit=1")
            .map_err(|e| SettingsError::Unavailable(format!("invalid settings URL: {e}")))?;

        let response = self
            .endpoint
            .authorize(self.http.get(url), None)
            .send()
            .await
            .map_err(|e| SettingsError::Unavailable(format!("settings request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SettingsError::Unavailable(format!(
                "settings request returned {status}: {body}"
            )));
        }

        let rows: Vec<GeneralSettings> = response
            .json()
            .await
            .map_err(|e| SettingsError::Malformed(e.to_string()))?;
        // No settings row yet means every toggle is off.
        Ok(rows.into_iter().next().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_map_to_distinct_categories() {
        let cases = [
            (r#"{"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#, AuthError::InvalidCredentials),
            (r#"{"error_code":"email_not_confirmed","msg":"Email not confirmed"}"#, AuthError::EmailNotConfirmed),
            (r#"{"error_code":"user_already_exists","msg":"User already registered"}"#, AuthError::UserAlreadyExists),
            (r#"{"error_code":"email_address_invalid","msg":"bad"}"#, AuthError::InvalidEmail),
        ];
        for (body, expected) in cases {
            assert_eq!(map_provider_error(StatusCode::BAD_REQUEST, body), expected, "{body}");
        }
    }

    #[test]
    fn legacy_invalid_grant_is_invalid_credentials() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert_eq!(
            map_provider_error(StatusCode::BAD_REQUEST, body),
            AuthError::InvalidCredentials
        );

        let unconfirmed = r#"{"error":"invalid_grant","error_description":"Email not confirmed"}"#;
        assert_eq!(
            map_provider_error(StatusCode::BAD_REQUEST, unconfirmed),
            AuthError::EmailNotConfirmed
        );
    }

    #[test]
    fn too_many_requests_is_rate_limited() {
        assert_eq!(
            map_provider_error(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            AuthError::RateLimited
        );
    }

    #[test]
    fn weak_password_keeps_provider_message() {
        let body = r#"{"error_code":"weak_password","msg":"Password should be at least 8 characters"}"#;
        assert_eq!(
            map_provider_error(StatusCode::UNPROCESSABLE_ENTITY, body),
            AuthError::WeakPassword("Password should be at least 8 characters".to_string())
        );
    }

    #[test]
    fn unknown_failures_split_by_status() {
        assert!(matches!(
            map_provider_error(StatusCode::BAD_GATEWAY, "<html>"),
            AuthError::Unavailable(_)
        ));
        assert!(matches!(
            map_provider_error(StatusCode::BAD_REQUEST, r#"{"msg":"something odd"}"#),
            AuthError::Provider(_)
        ));
    }

    #[test]
    fn signup_response_detects_pending_confirmation() {
        let pending: SignUpResponse =
            serde_json::from_str(r#"{"id":"u1","email":"sam@example.com","confirmation_sent_at":"2026-01-01T00:00:00Z"}"#)
                .unwrap();
        let pending = pending.into_pending("sam@example.com");
        assert!(pending.confirmation_required);
        assert_eq!(pending.id, "u1");

        let confirmed: SignUpResponse = serde_json::from_str(
            r#"{"access_token":"t","refresh_token":"r","expires_in":3600,"user":{"id":"u2","email":"lee@example.com"}}"#,
        )
        .unwrap();
        let confirmed = confirmed.into_pending("lee@example.com");
        assert!(!confirmed.confirmation_required);
        assert_eq!(confirmed.id, "u2");
    }

    #[test]
    fn token_response_builds_session() {
        let token: TokenResponse = serde_json::from_str(
            r#"{"access_token":"t","refresh_token":"r","expires_in":60,"user":{"id":"u1","email":"sam@example.com"}}"#,
        )
        .unwrap();
        let session = token.into_session();
        assert_eq!(session.user_id, "u1");
        assert_eq!(session.refresh_token.as_deref(), Some("r"));
        assert!(!session.is_expired());
    }

    #[tokio::test]
    async fn sign_out_without_session_still_notifies() {
        let endpoint = ServiceEndpoint::new(url::Url::parse("http://127.0.0.1:9/auth/v1").unwrap(), None);
        let provider = HttpIdentityProvider::new(endpoint, Client::new());
        let mut events = provider.subscribe();

        provider.sign_out().await.unwrap();
        assert_eq!(events.recv().await.unwrap().event, crate::session::SessionEvent::SignedOut);
        assert!(provider.current_session().await.unwrap().is_none());
    }
}
