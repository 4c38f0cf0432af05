// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canonical portal roles and raw-role normalization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Canonical roles understood by the policy engine.
///
/// ## Role Hierarchy
///
/// - `Admin` - Gym owners/managers, everything staff can do plus administration
/// - `Staff` - Front desk, instructors, trainers
/// - `Member` - Paying members with an active membership
/// - `Nonmember` - Registered accounts without a membership (guests, expired)
/// - `Inactive` - Suspended or cancelled accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalRole {
    Inactive,
    Nonmember,
    Member,
    Staff,
    Admin,
}

/// Role applied when the raw value is missing or unrecognized.
///
/// Kept as `Member` to match the portal's existing behavior; the least
/// privileged role would be `Inactive`.
pub const FALLBACK_ROLE: CanonicalRole = CanonicalRole::Member;

const ADMIN_SYNONYMS: &[&str] = &["admin", "administrator", "super_admin", "superadmin", "owner"];
const STAFF_SYNONYMS: &[&str] = &[
    "staff",
    "instructor",
    "trainer",
    "employee",
    "coach",
    "front_desk",
];
const MEMBER_SYNONYMS: &[&str] = &["member", "active", "active_member"];
const NONMEMBER_SYNONYMS: &[&str] = &[
    "nonmember",
    "non_member",
    "non-member",
    "expired",
    "guest",
    "prospect",
];
const INACTIVE_SYNONYMS: &[&str] = &["inactive", "suspended", "cancelled", "canceled", "disabled"];

impl CanonicalRole {
    pub const ALL: [CanonicalRole; 5] = [
        CanonicalRole::Inactive,
        CanonicalRole::Nonmember,
        CanonicalRole::Member,
        CanonicalRole::Staff,
        CanonicalRole::Admin,
    ];

    /// Resolve a raw role string into exactly one canonical role.
    ///
    /// Matching trims whitespace and ignores case. Missing, empty and
    /// unrecognized values all resolve to [`FALLBACK_ROLE`]; unrecognized
    /// non-empty values are logged.
    pub fn normalize(raw: Option<&str>) -> CanonicalRole {
        let Some(raw) = raw else {
            return FALLBACK_ROLE;
        };

        let key = raw.trim().to_lowercase();
        if key.is_empty() {
            return FALLBACK_ROLE;
        }

        match Self::lookup(&key) {
            Some(role) => role,
            None => {
                tracing::warn!(raw_role = %raw, fallback = %FALLBACK_ROLE, "Unrecognized role, using fallback");
                FALLBACK_ROLE
            }
        }
    }

    /// Strict lookup of an already-lowercased role key.
    fn lookup(key: &str) -> Option<CanonicalRole> {
        let groups: [(&[&str], CanonicalRole); 5] = [
            (ADMIN_SYNONYMS, CanonicalRole::Admin),
            (STAFF_SYNONYMS, CanonicalRole::Staff),
            (MEMBER_SYNONYMS, CanonicalRole::Member),
            (NONMEMBER_SYNONYMS, CanonicalRole::Nonmember),
            (INACTIVE_SYNONYMS, CanonicalRole::Inactive),
        ];

        groups
            .iter()
            .find(|(synonyms, _)| synonyms.contains(&key))
            .map(|(_, role)| *role)
    }

    /// Parse a canonical role or synonym without falling back.
    pub fn parse(raw: &str) -> Option<CanonicalRole> {
        Self::lookup(&raw.trim().to_lowercase())
    }

    /// Roles that never get the regular dashboards and are steered to the
    /// membership prompt instead.
    pub fn is_exception(&self) -> bool {
        matches!(self, CanonicalRole::Nonmember | CanonicalRole::Inactive)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalRole::Admin => "admin",
            CanonicalRole::Staff => "staff",
            CanonicalRole::Member => "member",
            CanonicalRole::Nonmember => "nonmember",
            CanonicalRole::Inactive => "inactive",
        }
    }
}

impl Default for CanonicalRole {
    fn default() -> Self {
        FALLBACK_ROLE
    }
}

impl std::fmt::Display for CanonicalRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
