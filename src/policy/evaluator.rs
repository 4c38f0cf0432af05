// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pure policy queries over the role table.
//!
//! - No IO
//! - No panics
//! - Unknown roles or routes resolve to a safe answer, never an error

use std::cmp::Ordering;

use super::roles::{CanonicalRole, FALLBACK_ROLE};
use super::routes::{matches_any, path_only, RoutePattern, MEMBER_DASHBOARD_ROUTE};
use super::table::{table, Capability, Permissions, RoleRecord};

fn record(role: CanonicalRole) -> Option<&'static RoleRecord> {
    table().record(role)
}

/// Landing route for a role; falls back to the member dashboard.
pub fn default_route(role: CanonicalRole) -> &'static str {
    record(role)
        .or_else(|| record(FALLBACK_ROLE))
        .map(|r| r.default_route)
        .unwrap_or(MEMBER_DASHBOARD_ROUTE)
}

/// Ordered route patterns the role may reach, universal routes first.
pub fn accessible_patterns(role: CanonicalRole) -> &'static [RoutePattern] {
    record(role).map(|r| r.patterns.as_slice()).unwrap_or(&[])
}

/// True if `route` is admitted by one of the role's patterns.
///
/// Query strings and fragments are ignored.
pub fn can_access(route: &str, role: CanonicalRole) -> bool {
    matches_any(accessible_patterns(role), path_only(route))
}

pub fn permissions(role: CanonicalRole) -> Permissions {
    record(role).map(|r| r.permissions).unwrap_or_default()
}

pub fn has_permission(role: CanonicalRole, capability: Capability) -> bool {
    permissions(role).has(capability)
}

/// Capability lookup by view-layer key; unknown keys are false.
pub fn has_permission_key(role: CanonicalRole, key: &str) -> bool {
    permissions(role).get(key)
}

pub fn rank(role: CanonicalRole) -> u8 {
    record(role).map(|r| r.rank).unwrap_or(0)
}

/// Compare two roles by rank: -1, 0 or 1.
pub fn compare(a: CanonicalRole, b: CanonicalRole) -> i8 {
    match rank(a).cmp(&rank(b)) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::routes::GENERAL_DASHBOARD_ROUTE;

    #[test]
    fn administrator_reaches_admin_settings() {
        let role = CanonicalRole::normalize(Some("Administrator"));
        assert_eq!(role, CanonicalRole::Admin);
        assert!(can_access("/admin/settings", role));
        assert_eq!(default_route(role), GENERAL_DASHBOARD_ROUTE);
    }

    #[test]
    fn every_role_can_reach_its_default_route() {
        for role in CanonicalRole::ALL {
            assert!(can_access(default_route(role), role), "{role} locked out of its landing page");
        }
    }

    #[test]
    fn member_default_route_is_member_dashboard() {
        assert_eq!(default_route(CanonicalRole::Member), "/member/dashboard");
    }

    #[test]
    fn access_is_monotonic_up_the_hierarchy() {
        let chain = [CanonicalRole::Member, CanonicalRole::Staff, CanonicalRole::Admin];
        for (i, lower) in chain.iter().enumerate() {
            for higher in &chain[i + 1..] {
                for pattern in accessible_patterns(*lower) {
                    assert!(
                        accessible_patterns(*higher).contains(pattern),
                        "{higher} lacks {pattern} granted to {lower}"
                    );
                }
                for capability in Capability::ALL {
                    if has_permission(*lower, capability) {
                        assert!(has_permission(*higher, capability));
                    }
                }
            }
        }
    }

    #[test]
    fn universal_routes_are_reachable_by_everyone() {
        for role in CanonicalRole::ALL {
            assert!(can_access("/dashboard", role));
            assert!(can_access("/profile", role));
            assert!(can_access("/settings", role));
        }
    }

    #[test]
    fn role_specific_prefixes_are_gated() {
        assert!(can_access("/member/classes/12", CanonicalRole::Member));
        assert!(!can_access("/admin/members", CanonicalRole::Member));
        assert!(!can_access("/admin/members", CanonicalRole::Staff));
        assert!(can_access("/members/42", CanonicalRole::Staff));
        assert!(!can_access("/member/dashboard", CanonicalRole::Nonmember));
        assert!(can_access("/nonmember-prompt", CanonicalRole::Inactive));
    }

    #[test]
    fn matching_is_case_sensitive_and_ignores_query() {
        assert!(!can_access("/Admin/settings", CanonicalRole::Admin));
        assert!(can_access("/member/dashboard?week=3", CanonicalRole::Member));
    }

    #[test]
    fn unknown_capability_keys_read_false() {
        assert!(!has_permission_key(CanonicalRole::Admin, "canLaunchRockets"));
        assert!(has_permission_key(CanonicalRole::Admin, "canManageMembers"));
        assert!(!has_permission_key(CanonicalRole::Member, "canViewReports"));
    }

    #[test]
    fn compare_orders_by_rank() {
        assert_eq!(compare(CanonicalRole::Admin, CanonicalRole::Staff), 1);
        assert_eq!(compare(CanonicalRole::Member, CanonicalRole::Member), 0);
        assert_eq!(compare(CanonicalRole::Inactive, CanonicalRole::Nonmember), -1);
    }
}
