// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Profile Resolution
//!
//! Turns a provider session into a [`CurrentUser`].
//!
//! ## Strategy
//!
//! 1. Record found with a role: normalize and use it.
//! 2. Record found without a role: fill in the fallback role, persist the
//!    correction best-effort, use the corrected record.
//! 3. No record: synthesize a minimal profile, insert it best-effort, use it
//!    whether or not the insert succeeded.
//! 4. Lookup failed: synthesize the same minimal profile in memory only.
//!
//! [`ProfileResolver::try_resolve`] reports case 4 as an error;
//! [`ProfileResolver::resolve`] is the boundary that never fails.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::collaborators::ProfileStore;
use super::error::ProfileError;
use super::types::{CurrentUser, ProfilePatch, ProfileSource, Session, UserProfile};

/// Role and status given to synthesized or corrected profiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackProfile {
    pub role: String,
    pub status: String,
}

impl Default for FallbackProfile {
    fn default() -> Self {
        Self {
            role: "staff".to_string(),
            status: "active".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct ProfileResolver {
    store: Arc<dyn ProfileStore>,
    fallback: FallbackProfile,
}

impl ProfileResolver {
    pub fn new(store: Arc<dyn ProfileStore>, fallback: FallbackProfile) -> Self {
        Self { store, fallback }
    }

    /// Resolve a profile for `session`; never fails.
    pub async fn resolve(&self, session: &Session) -> CurrentUser {
        match self.try_resolve(session).await {
            Ok(user) => user,
            Err(e) => {
                warn!(
                    user_id = %session.user_id,
                    error = %e,
                    "Profile lookup failed, using in-memory fallback profile"
                );
                CurrentUser::new(self.synthesize(session), ProfileSource::Offline)
            }
        }
    }

    /// Resolve a profile, reporting lookup failures.
    ///
    /// Write failures (correction or insert) are logged and do not fail.
    pub async fn try_resolve(&self, session: &Session) -> Result<CurrentUser, ProfileError> {
        let user_id = session.user_id.as_str();

        match self.store.get_profile(user_id).await? {
            Some(profile) if profile.has_role() => {
                Ok(CurrentUser::new(profile, ProfileSource::Stored))
            }
            Some(mut profile) => {
                profile.role = Some(self.fallback.role.clone());
                let patch = ProfilePatch {
                    role: profile.role.clone(),
                    status: None,
                };
                match self.store.update_profile(user_id, &patch).await {
                    Ok(()) => info!(%user_id, role = %self.fallback.role, "Filled in missing profile role"),
                    Err(e) => warn!(%user_id, error = %e, "Failed to persist profile role correction"),
                }
                Ok(CurrentUser::new(profile, ProfileSource::Corrected))
            }
            None => {
                let profile = self.synthesize(session);
                match self.store.insert_profile(&profile).await {
                    Ok(()) => info!(%user_id, "Created fallback profile for new session"),
                    Err(e) => warn!(%user_id, error = %e, "Failed to insert fallback profile"),
                }
                Ok(CurrentUser::new(profile, ProfileSource::Synthesized))
            }
        }
    }

    fn synthesize(&self, session: &Session) -> UserProfile {
        UserProfile {
            id: session.user_id.clone(),
            email: session.email.clone(),
            role: Some(self.fallback.role.clone()),
            status: Some(self.fallback.status.clone()),
            first_name: None,
            last_name: None,
            created_at: Some(Utc::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::memory::InMemoryProfileStore;
    use crate::policy::CanonicalRole;
    use chrono::Duration;

    fn session() -> Session {
        Session::new(
            "user_42",
            Some("pat@example.com".to_string()),
            "token",
            Duration::hours(1),
        )
    }

    fn stored(role: Option<&str>) -> UserProfile {
        UserProfile {
            id: "user_42".to_string(),
            email: Some("pat@example.com".to_string()),
            role: role.map(str::to_string),
            status: Some("active".to_string()),
            first_name: Some("Pat".to_string()),
            last_name: None,
            created_at: None,
        }
    }

    fn resolver(store: &Arc<InMemoryProfileStore>) -> ProfileResolver {
        ProfileResolver::new(store.clone(), FallbackProfile::default())
    }

    #[tokio::test]
    async fn stored_profile_is_normalized() {
        let store = Arc::new(InMemoryProfileStore::new());
        store.seed(stored(Some("Trainer")));

        let user = resolver(&store).resolve(&session()).await;
        assert_eq!(user.source, ProfileSource::Stored);
        assert_eq!(user.role, CanonicalRole::Staff);
        assert_eq!(store.write_attempts(), 0);
    }

    #[tokio::test]
    async fn missing_role_is_corrected_and_persisted() {
        let store = Arc::new(InMemoryProfileStore::new());
        store.seed(stored(None));

        let user = resolver(&store).resolve(&session()).await;
        assert_eq!(user.source, ProfileSource::Corrected);
        assert_eq!(user.profile.role.as_deref(), Some("staff"));
        assert_eq!(user.profile.first_name.as_deref(), Some("Pat"));
        assert_eq!(
            store.profile("user_42").unwrap().role.as_deref(),
            Some("staff")
        );
    }

    #[tokio::test]
    async fn failed_correction_still_returns_corrected_profile() {
        let store = Arc::new(InMemoryProfileStore::new());
        store.seed(stored(Some("")));
        store.fail_writes(true);

        let user = resolver(&store).resolve(&session()).await;
        assert_eq!(user.source, ProfileSource::Corrected);
        assert_eq!(user.role, CanonicalRole::Staff);
        assert_eq!(store.profile("user_42").unwrap().role.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn not_found_synthesizes_staff_profile_and_attempts_insert() {
        let store = Arc::new(InMemoryProfileStore::new());
        store.fail_writes(true);

        let user = resolver(&store).resolve(&session()).await;
        assert_eq!(user.source, ProfileSource::Synthesized);
        assert_eq!(user.profile.role.as_deref(), Some("staff"));
        assert_eq!(user.profile.status.as_deref(), Some("active"));
        assert_eq!(user.profile.email.as_deref(), Some("pat@example.com"));
        assert!(user.profile.first_name.is_none());
        assert_eq!(store.write_attempts(), 1);
        assert!(store.profile("user_42").is_none());
    }

    #[tokio::test]
    async fn not_found_inserts_when_store_accepts() {
        let store = Arc::new(InMemoryProfileStore::new());

        let user = resolver(&store).resolve(&session()).await;
        assert_eq!(user.source, ProfileSource::Synthesized);
        assert_eq!(store.profile("user_42"), Some(user.profile));
    }

    #[tokio::test]
    async fn lookup_failure_falls_back_without_persisting() {
        let store = Arc::new(InMemoryProfileStore::new());
        store.fail_lookups(true);

        let resolver = resolver(&store);
        assert!(matches!(
            resolver.try_resolve(&session()).await,
            Err(ProfileError::Unavailable(_))
        ));

        let user = resolver.resolve(&session()).await;
        assert_eq!(user.source, ProfileSource::Offline);
        assert_eq!(user.profile.role.as_deref(), Some("staff"));
        assert_eq!(store.write_attempts(), 0);
    }

    #[tokio::test]
    async fn fallback_role_is_configurable() {
        let store = Arc::new(InMemoryProfileStore::new());
        let resolver = ProfileResolver::new(
            store.clone(),
            FallbackProfile {
                role: "member".to_string(),
                status: "pending".to_string(),
            },
        );

        let user = resolver.resolve(&session()).await;
        assert_eq!(user.role, CanonicalRole::Member);
        assert_eq!(user.profile.status.as_deref(), Some("pending"));
    }
}
