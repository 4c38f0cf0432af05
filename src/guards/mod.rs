// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Route Guards
//!
//! Decide, for a session snapshot and a target location, whether the view
//! layer should show a loading state, render the screen, or redirect.
//!
//! - [`AuthenticatedGuard`]: screens that need a signed-in user
//! - [`PublicGuard`]: login and signup screens
//!
//! Guards are pure over their inputs; the only asynchronous input is the
//! nonmember prompt setting, loaded once by [`PromptSetting::mount`].

pub mod authenticated;
pub mod public;

use serde::Serialize;
use utoipa::ToSchema;

pub use authenticated::{AuthenticatedGuard, PromptSetting};
pub use public::PublicGuard;

/// Why a guard redirected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RedirectReason {
    /// No signed-in user
    Unauthenticated,
    /// Nonmember, inactive or role-less user sent to the signup prompt
    NonmemberPrompt,
    /// Nonmember, inactive or role-less user sent to the general dashboard
    NonmemberRestricted,
    /// The role's patterns do not cover the target
    RouteDenied,
    /// The role is not in the screen's explicit allow-list
    RoleNotAllowed,
    /// A signed-in user opened a public screen
    AlreadyAuthenticated,
}

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Session or settings not known yet
    Loading,
    Render,
    Redirect {
        to: String,
        /// Location to return to after signing in
        #[serde(skip_serializing_if = "Option::is_none")]
        from: Option<String>,
        reason: RedirectReason,
    },
}

impl GuardDecision {
    pub fn redirect(to: impl Into<String>, reason: RedirectReason) -> Self {
        GuardDecision::Redirect {
            to: to.into(),
            from: None,
            reason,
        }
    }

    pub fn redirect_to_login(from: impl Into<String>) -> Self {
        GuardDecision::Redirect {
            to: crate::policy::routes::LOGIN_ROUTE.to_string(),
            from: Some(from.into()),
            reason: RedirectReason::Unauthenticated,
        }
    }
}
