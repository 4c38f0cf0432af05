// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Interfaces to the external collaborators the session layer consumes.
//!
//! Implementations live in [`crate::clients`]: REST clients for production
//! and in-memory versions for development mode and tests.

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::error::{AuthError, ProfileError, SettingsError};
use super::types::{
    GeneralSettings, PendingUser, ProfilePatch, Session, SessionChange, SignUpMetadata,
    UserProfile,
};

/// External identity provider (credential checks, token issuance).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Existing session, if the provider holds one.
    async fn current_session(&self) -> Result<Option<Session>, AuthError>;

    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<Session, AuthError>;

    /// Create an account. Does not sign the new user in.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: SignUpMetadata,
    ) -> Result<PendingUser, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Subscribe to session changes. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<SessionChange>;
}

/// Backing store for application profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// `Ok(None)` when no record exists for `id`.
    async fn get_profile(&self, id: &str) -> Result<Option<UserProfile>, ProfileError>;

    async fn insert_profile(&self, profile: &UserProfile) -> Result<(), ProfileError>;

    async fn update_profile(&self, id: &str, patch: &ProfilePatch) -> Result<(), ProfileError>;
}

/// Read access to general application settings.
#[async_trait]
pub trait SettingsSource: Send + Sync {
    async fn general_settings(&self) -> Result<GeneralSettings, SettingsError>;
}
