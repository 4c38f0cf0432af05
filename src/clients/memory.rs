// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory collaborators.
//!
//! Used when no identity/profile/settings URLs are configured (development
//! mode) and as fakes in tests. Each one can be told to fail or stall so the
//! orchestrator's recovery paths can be exercised.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::session::{
    AuthError, GeneralSettings, IdentityProvider, PendingUser, ProfileError, ProfilePatch,
    ProfileStore, Session, SessionChange, SettingsError, SettingsSource, SignUpMetadata,
    UserProfile,
};

/// Failed sign-ins allowed per email before the provider rate-limits it.
pub const MAX_FAILED_ATTEMPTS: u32 = 5;

/// Minimum password length accepted at sign-up.
pub const MIN_PASSWORD_LEN: usize = 8;

const SESSION_TTL_MINUTES: i64 = 60;
const EVENT_CHANNEL_CAPACITY: usize = 32;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Account {
    id: String,
    email: String,
    password: String,
    confirmed: bool,
    failed_attempts: u32,
    metadata: SignUpMetadata,
}

#[derive(Default)]
struct IdentityState {
    /// Keyed by lowercased email
    accounts: HashMap<String, Account>,
    session: Option<Session>,
}

pub struct InMemoryIdentityProvider {
    state: Mutex<IdentityState>,
    events: broadcast::Sender<SessionChange>,
    require_confirmation: AtomicBool,
    session_query_fails: AtomicBool,
    session_query_delay: Mutex<Option<Duration>>,
    sign_out_fails: AtomicBool,
    session_queries: AtomicUsize,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(IdentityState::default()),
            events,
            require_confirmation: AtomicBool::new(false),
            session_query_fails: AtomicBool::new(false),
            session_query_delay: Mutex::new(None),
            sign_out_fails: AtomicBool::new(false),
            session_queries: AtomicUsize::new(0),
        }
    }

    /// Require email confirmation for accounts created through `sign_up`.
    pub fn with_confirmation_required(self, required: bool) -> Self {
        self.require_confirmation.store(required, Ordering::SeqCst);
        self
    }

    /// Create a confirmed account and return its user ID.
    pub fn register(&self, email: &str, password: &str) -> String {
        self.insert_account(email, password, true, SignUpMetadata::default())
    }

    /// Create an account that still needs email confirmation.
    pub fn register_unconfirmed(&self, email: &str, password: &str) -> String {
        self.insert_account(email, password, false, SignUpMetadata::default())
    }

    fn insert_account(
        &self,
        email: &str,
        password: &str,
        confirmed: bool,
        metadata: SignUpMetadata,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        let account = Account {
            id: id.clone(),
            email: email.to_string(),
            password: password.to_string(),
            confirmed,
            failed_attempts: 0,
            metadata,
        };
        lock(&self.state)
            .accounts
            .insert(email.to_lowercase(), account);
        id
    }

    pub fn confirm_email(&self, email: &str) -> bool {
        match lock(&self.state).accounts.get_mut(&email.to_lowercase()) {
            Some(account) => {
                account.confirmed = true;
                true
            }
            None => false,
        }
    }

    /// Metadata stored at sign-up.
    pub fn metadata(&self, email: &str) -> Option<SignUpMetadata> {
        lock(&self.state)
            .accounts
            .get(&email.to_lowercase())
            .map(|account| account.metadata.clone())
    }

    /// Install a session for `user_id` without emitting an event, as if it
    /// had been persisted by an earlier run.
    pub fn restore_session(&self, user_id: &str) -> Option<Session> {
        let mut state = lock(&self.state);
        let email = state
            .accounts
            .values()
            .find(|account| account.id == user_id)
            .map(|account| account.email.clone())?;
        let session = new_session(user_id, Some(email));
        state.session = Some(session.clone());
        Some(session)
    }

    /// Issue fresh tokens for the current session and emit `TOKEN_REFRESHED`.
    pub async fn refresh_session(&self) -> Result<Session, AuthError> {
        let refreshed = {
            let mut state = lock(&self.state);
            let current = state.session.as_ref().ok_or(AuthError::SessionMissing)?;
            let refreshed = new_session(&current.user_id, current.email.clone());
            state.session = Some(refreshed.clone());
            refreshed
        };
        self.emit(SessionChange::token_refreshed(refreshed.clone()));
        Ok(refreshed)
    }

    pub fn fail_session_query(&self, fail: bool) {
        self.session_query_fails.store(fail, Ordering::SeqCst);
    }

    pub fn delay_session_query(&self, delay: Duration) {
        *lock(&self.session_query_delay) = Some(delay);
    }

    pub fn fail_sign_out(&self, fail: bool) {
        self.sign_out_fails.store(fail, Ordering::SeqCst);
    }

    /// Number of `current_session` calls served so far.
    pub fn session_queries(&self) -> usize {
        self.session_queries.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    fn emit(&self, change: SessionChange) {
        // No subscribers is fine.
        let _ = self.events.send(change);
    }
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn new_session(user_id: &str, email: Option<String>) -> Session {
    let mut session = Session::new(
        user_id,
        email,
        Uuid::new_v4().to_string(),
        chrono::Duration::minutes(SESSION_TTL_MINUTES),
    );
    session.refresh_token = Some(Uuid::new_v4().to_string());
    session
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        self.session_queries.fetch_add(1, Ordering::SeqCst);

        let delay = *lock(&self.session_query_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.session_query_fails.load(Ordering::SeqCst) {
            return Err(AuthError::Unavailable("session query failed".to_string()));
        }

        let state = lock(&self.state);
        Ok(state.session.clone().filter(|session| !session.is_expired()))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let session = {
            let mut state = lock(&self.state);
            let account = state
                .accounts
                .get_mut(&email.to_lowercase())
                .ok_or(AuthError::InvalidCredentials)?;

            if account.password != password {
                if account.failed_attempts >= MAX_FAILED_ATTEMPTS {
                    return Err(AuthError::RateLimited);
                }
                account.failed_attempts += 1;
                return Err(AuthError::InvalidCredentials);
            }
            if !account.confirmed {
                return Err(AuthError::EmailNotConfirmed);
            }

            account.failed_attempts = 0;
            let session = new_session(&account.id, Some(account.email.clone()));
            state.session = Some(session.clone());
            session
        };

        self.emit(SessionChange::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: SignUpMetadata,
    ) -> Result<PendingUser, AuthError> {
        if !email.contains('@') {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword(format!(
                "use at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if lock(&self.state).accounts.contains_key(&email.to_lowercase()) {
            return Err(AuthError::UserAlreadyExists);
        }

        let confirmation_required = self.require_confirmation.load(Ordering::SeqCst);
        let id = self.insert_account(email, password, !confirmation_required, metadata);

        Ok(PendingUser {
            id,
            email: email.to_string(),
            confirmation_required,
        })
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.sign_out_fails.load(Ordering::SeqCst) {
            return Err(AuthError::Unavailable("sign-out request failed".to_string()));
        }

        lock(&self.state).session = None;
        self.emit(SessionChange::signed_out());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.events.subscribe()
    }
}

/// In-memory profile table.
pub struct InMemoryProfileStore {
    profiles: Mutex<HashMap<String, UserProfile>>,
    lookups_fail: AtomicBool,
    writes_fail: AtomicBool,
    lookup_delay: Mutex<Option<Duration>>,
    write_attempts: AtomicUsize,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self {
            profiles: Mutex::new(HashMap::new()),
            lookups_fail: AtomicBool::new(false),
            writes_fail: AtomicBool::new(false),
            lookup_delay: Mutex::new(None),
            write_attempts: AtomicUsize::new(0),
        }
    }

    /// Insert or replace a profile directly, bypassing failure injection.
    pub fn seed(&self, profile: UserProfile) {
        lock(&self.profiles).insert(profile.id.clone(), profile);
    }

    pub fn profile(&self, id: &str) -> Option<UserProfile> {
        lock(&self.profiles).get(id).cloned()
    }

    pub fn fail_lookups(&self, fail: bool) {
        self.lookups_fail.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.writes_fail.store(fail, Ordering::SeqCst);
    }

    pub fn delay_lookups(&self, delay: Duration) {
        *lock(&self.lookup_delay) = Some(delay);
    }

    /// Insert and update calls received, successful or not.
    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    fn check_write(&self) -> Result<(), ProfileError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        if self.writes_fail.load(Ordering::SeqCst) {
            Err(ProfileError::Unavailable("write rejected".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for InMemoryProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_profile(&self, id: &str) -> Result<Option<UserProfile>, ProfileError> {
        let delay = *lock(&self.lookup_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.lookups_fail.load(Ordering::SeqCst) {
            return Err(ProfileError::Unavailable("lookup failed".to_string()));
        }
        Ok(self.profile(id))
    }

    async fn insert_profile(&self, profile: &UserProfile) -> Result<(), ProfileError> {
        self.check_write()?;

        let mut profiles = lock(&self.profiles);
        if profiles.contains_key(&profile.id) {
            return Err(ProfileError::Rejected(format!(
                "profile {} already exists",
                profile.id
            )));
        }
        profiles.insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn update_profile(&self, id: &str, patch: &ProfilePatch) -> Result<(), ProfileError> {
        self.check_write()?;

        let mut profiles = lock(&self.profiles);
        let profile = profiles
            .get_mut(id)
            .ok_or_else(|| ProfileError::Rejected(format!("profile {id} not found")))?;
        if let Some(role) = &patch.role {
            profile.role = Some(role.clone());
        }
        if let Some(status) = &patch.status {
            profile.status = Some(status.clone());
        }
        Ok(())
    }
}

/// Fixed settings, or a source that always fails.
pub struct StaticSettings {
    settings: Option<GeneralSettings>,
}

impl StaticSettings {
    pub fn new(settings: GeneralSettings) -> Self {
        Self {
            settings: Some(settings),
        }
    }

    pub fn unavailable() -> Self {
        Self { settings: None }
    }
}

#[async_trait]
impl SettingsSource for StaticSettings {
    async fn general_settings(&self) -> Result<GeneralSettings, SettingsError> {
        self.settings
            .clone()
            .ok_or_else(|| SettingsError::Unavailable("no settings configured".to_string()))
    }
}
