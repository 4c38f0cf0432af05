// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Route patterns and the prefix matcher.
//!
//! A pattern is either an exact path (`/dashboard`) or a prefix ending in a
//! `*` wildcard (`/member/*`), which admits every route starting with the
//! literal text before the `*`. Matching is case-sensitive and never
//! extracts parameters.

use serde::{Serialize, Serializer};

pub const LOGIN_ROUTE: &str = "/login";
pub const SIGNUP_ROUTE: &str = "/signup";
pub const GENERAL_DASHBOARD_ROUTE: &str = "/dashboard";
pub const MEMBER_DASHBOARD_ROUTE: &str = "/member/dashboard";
pub const NONMEMBER_PROMPT_ROUTE: &str = "/nonmember-prompt";
pub const PROFILE_ROUTE: &str = "/profile";
pub const SETTINGS_ROUTE: &str = "/settings";

/// Routes every authenticated role may reach.
pub const UNIVERSAL_ROUTES: [RoutePattern; 3] = [
    RoutePattern::exact(GENERAL_DASHBOARD_ROUTE),
    RoutePattern::exact(PROFILE_ROUTE),
    RoutePattern::exact(SETTINGS_ROUTE),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutePattern {
    /// Matches one path exactly.
    Exact(&'static str),
    /// Matches every path starting with the prefix.
    Prefix(&'static str),
}

impl RoutePattern {
    pub const fn exact(path: &'static str) -> Self {
        RoutePattern::Exact(path)
    }

    /// Prefix pattern; `prefix` is the literal text before the wildcard.
    pub const fn prefix(prefix: &'static str) -> Self {
        RoutePattern::Prefix(prefix)
    }

    pub fn matches(&self, route: &str) -> bool {
        match self {
            RoutePattern::Exact(path) => route == *path,
            RoutePattern::Prefix(prefix) => route.starts_with(prefix),
        }
    }

    /// Pattern as written in route tables, e.g. `/admin/*`.
    pub fn render(&self) -> String {
        match self {
            RoutePattern::Exact(path) => (*path).to_string(),
            RoutePattern::Prefix(prefix) => format!("{prefix}*"),
        }
    }
}

impl std::fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

impl Serialize for RoutePattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.render())
    }
}

/// True if any pattern admits `route`.
pub fn matches_any(patterns: &[RoutePattern], route: &str) -> bool {
    patterns.iter().any(|pattern| pattern.matches(route))
}

/// Path component of a location that may carry a query string or fragment.
pub fn path_only(location: &str) -> &str {
    let end = location.find(['?', '#']).unwrap_or(location.len());
    &location[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_pattern_matches_only_itself() {
        let pattern = RoutePattern::exact("/dashboard");
        assert!(pattern.matches("/dashboard"));
        assert!(!pattern.matches("/dashboard/stats"));
        assert!(!pattern.matches("/Dashboard"));
    }

    #[test]
    fn prefix_pattern_matches_everything_below() {
        let pattern = RoutePattern::prefix("/admin/");
        assert!(pattern.matches("/admin/settings"));
        assert!(pattern.matches("/admin/members/42"));
        assert!(!pattern.matches("/administrator"));
        assert!(!pattern.matches("/ADMIN/settings"));
    }

    #[test]
    fn render_marks_wildcards() {
        assert_eq!(RoutePattern::prefix("/member/").render(), "/member/*");
        assert_eq!(RoutePattern::exact("/profile").render(), "/profile");
        assert_eq!(
            serde_json::to_string(&RoutePattern::prefix("/classes/")).unwrap(),
            r#""/classes/*""#
        );
    }

    #[test]
    fn path_only_strips_query_and_fragment() {
        assert_eq!(path_only("/member/dashboard?tab=classes"), "/member/dashboard");
        assert_eq!(path_only("/admin#top"), "/admin");
        assert_eq!(path_only("/profile"), "/profile");
    }
}
