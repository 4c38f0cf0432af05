// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Orchestrator
//!
//! Owns the single "current user" cell and the auth-ready gate.
//!
//! ## Initialization
//!
//! 1. The initial session query and profile resolution run as a spawned task.
//! 2. That task races a fallback timer in `tokio::select!`. Whichever
//!    finishes first makes the gate `Ready`; the loser is a no-op for
//!    readiness. A resolution that loses still writes the user cell when it
//!    completes.
//! 3. When the task wins, the timer future is dropped (cancelled).
//!
//! ## Change stream
//!
//! The listener handles `SIGNED_IN` (background refresh, marks ready),
//! `SIGNED_OUT` (clears user cell and preferences immediately) and
//! `TOKEN_REFRESHED` (logged only). It runs until the shutdown token is
//! cancelled, which drops the subscription.
//!
//! ## Stale writes
//!
//! The cell carries a sign-out epoch. A resolution captures the epoch when
//! it starts and only writes if no sign-out happened since, so a sign-out is
//! never undone by a lookup that was already in flight.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::collaborators::{IdentityProvider, ProfileStore};
use super::error::AuthError;
use super::preferences::PreferenceCache;
use super::profile::{FallbackProfile, ProfileResolver};
use super::ready::{ReadyCause, ReadyGate, SessionPhase};
use super::types::{CurrentUser, PendingUser, Session, SessionChange, SessionEvent, SignUpMetadata};

/// Default fallback readiness timer.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub ready_timeout: Duration,
    pub fallback: FallbackProfile,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            ready_timeout: DEFAULT_READY_TIMEOUT,
            fallback: FallbackProfile::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct UserCell {
    user: Option<CurrentUser>,
    signout_epoch: u64,
}

/// Point-in-time view of the session for guards and the HTTP surface.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub ready: bool,
    pub user: Option<CurrentUser>,
}

pub struct SessionOrchestrator {
    provider: Arc<dyn IdentityProvider>,
    resolver: ProfileResolver,
    preferences: PreferenceCache,
    ready: ReadyGate,
    cell: watch::Sender<UserCell>,
    ready_timeout: Duration,
}

impl SessionOrchestrator {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn ProfileStore>,
        preferences: PreferenceCache,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            provider,
            resolver: ProfileResolver::new(store, options.fallback),
            preferences,
            ready: ReadyGate::new(),
            cell: watch::Sender::new(UserCell::default()),
            ready_timeout: options.ready_timeout,
        }
    }

    /// Subscribe to session changes, spawn the listener and kick off
    /// initialization.
    ///
    /// The subscription is taken before initialization starts, so events
    /// that arrive while the initial query is in flight are not lost.
    /// Returns the listener task; it ends when `shutdown` is cancelled.
    pub fn start(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let events = self.provider.subscribe();
        let listener = tokio::spawn(Arc::clone(self).listen(events, shutdown));

        let this = Arc::clone(self);
        tokio::spawn(async move { this.initialize().await });

        listener
    }

    /// Run the initialization sequence once.
    ///
    /// Returns when the gate is `Ready`, either because the initial
    /// resolution finished or because the fallback timer fired.
    pub async fn initialize(self: &Arc<Self>) {
        if !self.ready.begin() {
            debug!(phase = ?self.ready.phase(), "Session initialization already started");
            return;
        }

        let epoch = self.signout_epoch();
        let this = Arc::clone(self);
        let mut primary = tokio::spawn(async move { this.resolve_initial_session(epoch).await });

        tokio::select! {
            joined = &mut primary => {
                if let Err(e) = joined {
                    warn!(error = %e, "Initial session resolution aborted");
                    self.ready.mark_ready(ReadyCause::SessionQueryFailed);
                }
            }
            _ = tokio::time::sleep(self.ready_timeout) => {
                self.force_ready_on_timeout();
            }
        }
    }

    /// Fallback timer body. Returns true only if it made the gate ready.
    pub fn force_ready_on_timeout(&self) -> bool {
        let forced = self.ready.mark_ready(ReadyCause::Timeout);
        if forced {
            warn!(
                timeout_ms = self.ready_timeout.as_millis() as u64,
                has_user = self.current_user().is_some(),
                "Auth readiness forced by fallback timer"
            );
        }
        forced
    }

    async fn resolve_initial_session(&self, epoch: u64) {
        match self.provider.current_session().await {
            Err(e) => {
                warn!(error = %e, "Session query failed, continuing signed out");
                self.ready.mark_ready(ReadyCause::SessionQueryFailed);
            }
            Ok(None) => {
                debug!("No existing session");
                self.ready.mark_ready(ReadyCause::NoSession);
            }
            Ok(Some(session)) => {
                let user = self.resolver.resolve(&session).await;
                self.store_user(user, epoch);
                self.ready.mark_ready(ReadyCause::ProfileResolved);
            }
        }
    }

    async fn listen(
        self: Arc<Self>,
        mut events: broadcast::Receiver<SessionChange>,
        shutdown: CancellationToken,
    ) {
        info!("Session listener starting");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Session listener shutting down");
                    return;
                }
                received = events.recv() => match received {
                    Ok(change) => self.handle_change(change, &shutdown),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Session listener lagged, some events were dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Identity provider closed the session stream");
                        return;
                    }
                },
            }
        }
    }

    /// Apply one session change notification.
    pub fn handle_change(self: &Arc<Self>, change: SessionChange, shutdown: &CancellationToken) {
        match change.event {
            SessionEvent::SignedIn => {
                match change.session {
                    Some(session) => self.refresh_in_background(session, shutdown.clone()),
                    None => warn!("SIGNED_IN event without a session"),
                }
                self.ready.mark_ready(ReadyCause::SignedIn);
            }
            SessionEvent::SignedOut => {
                info!("Signed out, clearing local session state");
                self.clear_local_state();
            }
            SessionEvent::TokenRefreshed => {
                let expires_at = change.session.as_ref().map(|s| s.expires_at);
                debug!(?expires_at, "Session token refreshed");
            }
        }
    }

    fn refresh_in_background(self: &Arc<Self>, session: Session, shutdown: CancellationToken) {
        let epoch = self.signout_epoch();
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let user = this.resolver.resolve(&session).await;
            if shutdown.is_cancelled() {
                debug!(user_id = %user.id(), "Dropping profile resolved after teardown");
                return;
            }
            this.store_user(user, epoch);
        });
    }

    /// Sign in with email and password.
    ///
    /// The profile is resolved before returning, so the caller can route
    /// immediately without waiting for the `SIGNED_IN` listener.
    pub async fn login(&self, email: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let session = self
            .provider
            .sign_in_with_password(email.trim(), password)
            .await
            .inspect_err(|e| info!(error_code = e.error_code(), "Sign-in rejected"))?;

        let user = self.resolver.resolve(&session).await;
        let stored = user.clone();
        self.cell.send_modify(|cell| cell.user = Some(stored));
        self.ready.mark_ready(ReadyCause::Login);

        info!(user_id = %user.id(), role = %user.role, "Signed in");
        Ok(user)
    }

    /// Create an account. The new user is not signed in.
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        metadata: SignUpMetadata,
    ) -> Result<PendingUser, AuthError> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::InvalidEmail);
        }

        let pending = self.provider.sign_up(email, password, metadata).await?;
        info!(
            user_id = %pending.id,
            confirmation_required = pending.confirmation_required,
            "Account created"
        );
        Ok(pending)
    }

    /// Sign out.
    ///
    /// Local state (user cell, preferences) is cleared even when the
    /// provider call fails; the failure is still returned to the caller.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.preferences.clear();
        let result = self.provider.sign_out().await;
        self.clear_local_state();

        if let Err(e) = &result {
            warn!(error = %e, "Provider sign-out failed, local session cleared anyway");
        }
        result
    }

    fn clear_local_state(&self) {
        self.preferences.clear();
        self.cell.send_modify(|cell| {
            cell.user = None;
            cell.signout_epoch += 1;
        });
    }

    /// Write a resolved user unless a sign-out happened after `epoch`.
    fn store_user(&self, user: CurrentUser, epoch: u64) -> bool {
        let user_id = user.profile.id.clone();
        let stored = self.cell.send_if_modified(|cell| {
            if cell.signout_epoch != epoch {
                return false;
            }
            cell.user = Some(user);
            true
        });

        if !stored {
            debug!(%user_id, "Discarding profile resolved before a sign-out");
        }
        stored
    }

    fn signout_epoch(&self) -> u64 {
        self.cell.borrow().signout_epoch
    }

    pub fn current_user(&self) -> Option<CurrentUser> {
        self.cell.borrow().user.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.is_ready()
    }

    pub fn phase(&self) -> SessionPhase {
        self.ready.phase()
    }

    pub fn ready_cause(&self) -> Option<ReadyCause> {
        self.ready.cause()
    }

    pub async fn wait_ready(&self) {
        self.ready.wait().await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let phase = self.ready.phase();
        SessionSnapshot {
            phase,
            ready: phase == SessionPhase::Ready,
            user: self.current_user(),
        }
    }

    pub fn preferences(&self) -> &PreferenceCache {
        &self.preferences
    }
}
