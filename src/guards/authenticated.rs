// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Guard for screens that require a signed-in user.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{GuardDecision, RedirectReason};
use crate::policy::routes::{path_only, GENERAL_DASHBOARD_ROUTE, NONMEMBER_PROMPT_ROUTE};
use crate::policy::{can_access, default_route, CanonicalRole};
use crate::session::{SessionSnapshot, SettingsSource};

struct PromptState {
    value: watch::Sender<Option<bool>>,
    mounted: AtomicBool,
}

/// The "nonmember signup prompt enabled" setting.
///
/// `None` until loaded. A failed load counts as disabled.
#[derive(Clone)]
pub struct PromptSetting {
    state: Arc<PromptState>,
}

impl PromptSetting {
    /// Not loaded yet.
    pub fn pending() -> Self {
        Self {
            state: Arc::new(PromptState {
                value: watch::Sender::new(None),
                mounted: AtomicBool::new(false),
            }),
        }
    }

    /// Already known; `mount` becomes a no-op.
    pub fn loaded(enabled: bool) -> Self {
        let setting = Self::pending();
        setting.state.mounted.store(true, Ordering::SeqCst);
        setting.set(enabled);
        setting
    }

    pub fn get(&self) -> Option<bool> {
        *self.state.value.borrow()
    }

    pub fn set(&self, enabled: bool) {
        self.state.value.send_replace(Some(enabled));
    }

    /// Fetch the setting once in the background. Later calls return `None`.
    pub fn mount(&self, source: Arc<dyn SettingsSource>) -> Option<JoinHandle<()>> {
        if self.state.mounted.swap(true, Ordering::SeqCst) {
            return None;
        }

        let setting = self.clone();
        Some(tokio::spawn(async move {
            let enabled = match source.general_settings().await {
                Ok(settings) => settings.nonmember_signup_prompt_enabled,
                Err(e) => {
                    warn!(error = %e, "Failed to load general settings, nonmember prompt disabled");
                    false
                }
            };
            debug!(enabled, "Nonmember prompt setting loaded");
            setting.set(enabled);
        }))
    }

    /// Wait for the setting to load.
    pub async fn wait_loaded(&self) -> bool {
        let mut rx = self.state.value.subscribe();
        let loaded = match rx.wait_for(Option::is_some).await {
            Ok(value) => value.unwrap_or(false),
            Err(_) => false,
        };
        loaded
    }
}

impl Default for PromptSetting {
    fn default() -> Self {
        Self::pending()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuthenticatedGuard {
    required_roles: Option<Vec<CanonicalRole>>,
}

impl AuthenticatedGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the screen to `roles`. An empty list means no restriction.
    pub fn with_required_roles(mut self, roles: impl IntoIterator<Item = CanonicalRole>) -> Self {
        let roles: Vec<_> = roles.into_iter().collect();
        self.required_roles = (!roles.is_empty()).then_some(roles);
        self
    }

    pub fn required_roles(&self) -> Option<&[CanonicalRole]> {
        self.required_roles.as_deref()
    }

    /// Decide what to show for `target`.
    ///
    /// Order: loading, unauthenticated, nonmember/inactive handling, route
    /// access, allow-list. The nonmember step runs before route access so it
    /// applies even to routes the role could otherwise reach.
    pub fn check(
        &self,
        target: &str,
        snapshot: &SessionSnapshot,
        prompt_enabled: Option<bool>,
    ) -> GuardDecision {
        let Some(prompt_enabled) = prompt_enabled.filter(|_| snapshot.ready) else {
            return GuardDecision::Loading;
        };

        let Some(user) = &snapshot.user else {
            return GuardDecision::redirect_to_login(target);
        };

        let role = user.role;
        let path = path_only(target);

        let restricted = role.is_exception() || !user.profile.has_role();
        if restricted && path != GENERAL_DASHBOARD_ROUTE {
            if !prompt_enabled {
                return GuardDecision::redirect(
                    GENERAL_DASHBOARD_ROUTE,
                    RedirectReason::NonmemberRestricted,
                );
            }
            if path != NONMEMBER_PROMPT_ROUTE {
                return GuardDecision::redirect(
                    NONMEMBER_PROMPT_ROUTE,
                    RedirectReason::NonmemberPrompt,
                );
            }
            // The prompt itself is outside every role's route table.
            return GuardDecision::Render;
        }

        if !can_access(target, role) {
            debug!(%role, route = target, "Route denied for role");
            return GuardDecision::redirect(default_route(role), RedirectReason::RouteDenied);
        }

        if let Some(allowed) = &self.required_roles {
            if !allowed.contains(&role) {
                debug!(%role, route = target, ?allowed, "Role not in screen allow-list");
                return GuardDecision::redirect(default_route(role), RedirectReason::RoleNotAllowed);
            }
        }

        GuardDecision::Render
    }
}
