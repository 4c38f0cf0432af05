// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Guard for login and signup screens.

use super::{GuardDecision, RedirectReason};
use crate::policy::default_route;
use crate::policy::routes::{path_only, LOGIN_ROUTE, SIGNUP_ROUTE};
use crate::session::SessionSnapshot;

#[derive(Debug, Clone, Copy, Default)]
pub struct PublicGuard;

impl PublicGuard {
    /// Signed-in users are sent back where they came from, or to their
    /// role's landing route.
    pub fn check(&self, from: Option<&str>, snapshot: &SessionSnapshot) -> GuardDecision {
        if !snapshot.ready {
            return GuardDecision::Loading;
        }

        let Some(user) = &snapshot.user else {
            return GuardDecision::Render;
        };

        let to = from
            .filter(|location| is_return_location(location))
            .unwrap_or_else(|| default_route(user.role));
        GuardDecision::redirect(to, RedirectReason::AlreadyAuthenticated)
    }
}

/// A preserved location is usable unless it is empty, not app-relative, or
/// one of the public screens themselves.
fn is_return_location(location: &str) -> bool {
    let path = path_only(location);
    path.starts_with('/')
        && !path.starts_with("//")
        && path != LOGIN_ROUTE
        && path != SIGNUP_ROUTE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{CurrentUser, ProfileSource, SessionPhase, UserProfile};

    fn snapshot(ready: bool, role: Option<&str>) -> SessionSnapshot {
        SessionSnapshot {
            phase: if ready {
                SessionPhase::Ready
            } else {
                SessionPhase::Initializing
            },
            ready,
            user: role.map(|role| {
                CurrentUser::new(
                    UserProfile {
                        id: "user_1".to_string(),
                        email: None,
                        role: Some(role.to_string()),
                        status: None,
                        first_name: None,
                        last_name: None,
                        created_at: None,
                    },
                    ProfileSource::Stored,
                )
            }),
        }
    }

    #[test]
    fn loading_until_ready() {
        assert_eq!(PublicGuard.check(None, &snapshot(false, None)), GuardDecision::Loading);
    }

    #[test]
    fn renders_for_anonymous_users() {
        assert_eq!(
            PublicGuard.check(Some("/classes/yoga"), &snapshot(true, None)),
            GuardDecision::Render
        );
    }

    #[test]
    fn member_without_from_goes_to_member_dashboard() {
        assert_eq!(
            PublicGuard.check(None, &snapshot(true, Some("member"))),
            GuardDecision::redirect("/member/dashboard", RedirectReason::AlreadyAuthenticated)
        );
    }

    #[test]
    fn preserved_location_wins() {
        assert_eq!(
            PublicGuard.check(Some("/reports/monthly?year=2026"), &snapshot(true, Some("staff"))),
            GuardDecision::redirect(
                "/reports/monthly?year=2026",
                RedirectReason::AlreadyAuthenticated
            )
        );
    }

    #[test]
    fn public_screens_are_not_return_locations() {
        for from in ["/login", "/signup?plan=gold", "", "https://evil.example", "//evil.example"] {
            assert_eq!(
                PublicGuard.check(Some(from), &snapshot(true, Some("admin"))),
                GuardDecision::redirect("/dashboard", RedirectReason::AlreadyAuthenticated),
                "{from}"
            );
        }
    }
}
