// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session, profile and settings types shared by the orchestrator, the
//! collaborators and the HTTP surface.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::policy::CanonicalRole;

/// Identity-provider session as observed by the portal.
///
/// Owned by the identity provider; the orchestrator never mutates it.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Provider user ID (the profile key)
    pub user_id: String,
    /// Email the provider has on file, if any
    #[serde(default)]
    pub email: Option<String>,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        user_id: impl Into<String>,
        email: Option<String>,
        access_token: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            email,
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: Utc::now() + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

// Tokens stay out of logs.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Session change notification kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEvent::SignedIn => write!(f, "SIGNED_IN"),
            SessionEvent::SignedOut => write!(f, "SIGNED_OUT"),
            SessionEvent::TokenRefreshed => write!(f, "TOKEN_REFRESHED"),
        }
    }
}

/// One notification from the identity provider's change stream.
#[derive(Debug, Clone)]
pub struct SessionChange {
    pub event: SessionEvent,
    pub session: Option<Session>,
}

impl SessionChange {
    pub fn signed_in(session: Session) -> Self {
        Self {
            event: SessionEvent::SignedIn,
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            event: SessionEvent::SignedOut,
            session: None,
        }
    }

    pub fn token_refreshed(session: Session) -> Self {
        Self {
            event: SessionEvent::TokenRefreshed,
            session: Some(session),
        }
    }
}

/// Application-level profile record, keyed by the provider user ID.
///
/// `role` is the raw, unvalidated value from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// True if the stored role is present and not blank.
    pub fn has_role(&self) -> bool {
        self.role.as_deref().is_some_and(|role| !role.trim().is_empty())
    }

    /// "First Last", falling back to the email address.
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if name.is_empty() {
            self.email.clone().unwrap_or_default()
        } else {
            name
        }
    }
}

/// Partial profile update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Where the current user's profile came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProfileSource {
    /// Read from the profile store as-is
    Stored,
    /// Read from the store with a missing role filled in
    Corrected,
    /// No record existed; synthesized (insert attempted)
    Synthesized,
    /// Store unreachable; synthesized in memory only
    Offline,
}

/// The signed-in user as exposed to the view layer.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CurrentUser {
    pub profile: UserProfile,
    /// Normalized role
    pub role: CanonicalRole,
    /// "First Last", or the email when no name is on file
    pub display_name: String,
    pub source: ProfileSource,
}

impl CurrentUser {
    pub fn new(profile: UserProfile, source: ProfileSource) -> Self {
        let role = CanonicalRole::normalize(profile.role.as_deref());
        let display_name = profile.display_name();
        Self {
            profile,
            role,
            display_name,
            source,
        }
    }

    pub fn id(&self) -> &str {
        &self.profile.id
    }
}

/// Metadata attached to a new account at sign-up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SignUpMetadata {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Account created by sign-up, not yet signed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PendingUser {
    pub id: String,
    pub email: String,
    /// True if the provider wants the email confirmed before sign-in
    pub confirmation_required: bool,
}

/// General application settings the guards depend on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneralSettings {
    #[serde(default, alias = "nonmemberSignupPromptEnabled")]
    pub nonmember_signup_prompt_enabled: bool,
    #[serde(default)]
    pub gym_name: Option<String>,
}
