// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Static role policy table.
//!
//! One [`RoleRecord`] per canonical role, built once at first use. Each tier
//! is constructed by extending the tier below it, so admin is a superset of
//! staff and staff a superset of member by construction.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Serialize;
use utoipa::ToSchema;

use super::roles::CanonicalRole;
use super::routes::{
    RoutePattern, GENERAL_DASHBOARD_ROUTE, MEMBER_DASHBOARD_ROUTE, NONMEMBER_PROMPT_ROUTE,
    UNIVERSAL_ROUTES,
};

/// Named capabilities a role may expose to the view layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    BookClasses,
    ViewOwnMembership,
    ViewSchedule,
    CheckInMembers,
    ManageMembers,
    ManageClasses,
    ViewReports,
    ManageBilling,
    ManageStaff,
    ManageSettings,
}

impl Capability {
    pub const ALL: [Capability; 10] = [
        Capability::BookClasses,
        Capability::ViewOwnMembership,
        Capability::ViewSchedule,
        Capability::CheckInMembers,
        Capability::ManageMembers,
        Capability::ManageClasses,
        Capability::ViewReports,
        Capability::ManageBilling,
        Capability::ManageStaff,
        Capability::ManageSettings,
    ];

    /// Key used by the view layer, e.g. `canManageMembers`.
    pub fn key(&self) -> &'static str {
        match self {
            Capability::BookClasses => "canBookClasses",
            Capability::ViewOwnMembership => "canViewOwnMembership",
            Capability::ViewSchedule => "canViewSchedule",
            Capability::CheckInMembers => "canCheckInMembers",
            Capability::ManageMembers => "canManageMembers",
            Capability::ManageClasses => "canManageClasses",
            Capability::ViewReports => "canViewReports",
            Capability::ManageBilling => "canManageBilling",
            Capability::ManageStaff => "canManageStaff",
            Capability::ManageSettings => "canManageSettings",
        }
    }

    pub fn from_key(key: &str) -> Option<Capability> {
        Self::ALL.into_iter().find(|capability| capability.key() == key)
    }
}

/// Capability flags for one role. Serializes as `{"canBookClasses": true, ...}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    pub can_book_classes: bool,
    pub can_view_own_membership: bool,
    pub can_view_schedule: bool,
    pub can_check_in_members: bool,
    pub can_manage_members: bool,
    pub can_manage_classes: bool,
    pub can_view_reports: bool,
    pub can_manage_billing: bool,
    pub can_manage_staff: bool,
    pub can_manage_settings: bool,
}

impl Permissions {
    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::BookClasses => self.can_book_classes,
            Capability::ViewOwnMembership => self.can_view_own_membership,
            Capability::ViewSchedule => self.can_view_schedule,
            Capability::CheckInMembers => self.can_check_in_members,
            Capability::ManageMembers => self.can_manage_members,
            Capability::ManageClasses => self.can_manage_classes,
            Capability::ViewReports => self.can_view_reports,
            Capability::ManageBilling => self.can_manage_billing,
            Capability::ManageStaff => self.can_manage_staff,
            Capability::ManageSettings => self.can_manage_settings,
        }
    }

    /// Look up a capability by its view-layer key. Unknown keys read as false.
    pub fn get(&self, key: &str) -> bool {
        Capability::from_key(key).is_some_and(|capability| self.has(capability))
    }

    fn grant(mut self, capabilities: &[Capability]) -> Self {
        for capability in capabilities {
            let flag = match capability {
                Capability::BookClasses => &mut self.can_book_classes,
                Capability::ViewOwnMembership => &mut self.can_view_own_membership,
                Capability::ViewSchedule => &mut self.can_view_schedule,
                Capability::CheckInMembers => &mut self.can_check_in_members,
                Capability::ManageMembers => &mut self.can_manage_members,
                Capability::ManageClasses => &mut self.can_manage_classes,
                Capability::ViewReports => &mut self.can_view_reports,
                Capability::ManageBilling => &mut self.can_manage_billing,
                Capability::ManageStaff => &mut self.can_manage_staff,
                Capability::ManageSettings => &mut self.can_manage_settings,
            };
            *flag = true;
        }
        self
    }
}

/// Immutable policy for one canonical role.
#[derive(Debug, Clone)]
pub struct RoleRecord {
    pub rank: u8,
    pub permissions: Permissions,
    pub default_route: &'static str,
    pub patterns: Vec<RoutePattern>,
}

impl RoleRecord {
    fn base(rank: u8, default_route: &'static str) -> Self {
        Self {
            rank,
            permissions: Permissions::default(),
            default_route,
            patterns: UNIVERSAL_ROUTES.to_vec(),
        }
    }

    /// Next tier up: inherits every pattern and capability of `self`.
    fn extend(&self, rank: u8, default_route: &'static str) -> Self {
        Self {
            rank,
            permissions: self.permissions,
            default_route,
            patterns: self.patterns.clone(),
        }
    }

    fn allow(mut self, patterns: &[RoutePattern]) -> Self {
        self.patterns.extend_from_slice(patterns);
        self
    }

    fn grant(mut self, capabilities: &[Capability]) -> Self {
        self.permissions = self.permissions.grant(capabilities);
        self
    }
}

pub struct RolePolicyTable {
    records: HashMap<CanonicalRole, RoleRecord>,
}

static STANDARD_TABLE: LazyLock<RolePolicyTable> = LazyLock::new(RolePolicyTable::standard);

/// The portal's policy table.
pub fn table() -> &'static RolePolicyTable {
    &STANDARD_TABLE
}

impl RolePolicyTable {
    pub fn standard() -> Self {
        let inactive = RoleRecord::base(0, GENERAL_DASHBOARD_ROUTE)
            .allow(&[
                RoutePattern::exact(NONMEMBER_PROMPT_ROUTE),
                RoutePattern::prefix("/memberships/"),
            ])
            .grant(&[Capability::ViewOwnMembership]);

        let nonmember = RoleRecord::base(1, GENERAL_DASHBOARD_ROUTE)
            .allow(&[
                RoutePattern::exact(NONMEMBER_PROMPT_ROUTE),
                RoutePattern::prefix("/memberships/"),
            ])
            .grant(&[Capability::ViewSchedule]);

        let member = RoleRecord::base(2, MEMBER_DASHBOARD_ROUTE)
            .allow(&[
                RoutePattern::prefix("/member/"),
                RoutePattern::prefix("/classes/"),
                RoutePattern::prefix("/bookings/"),
            ])
            .grant(&[
                Capability::BookClasses,
                Capability::ViewOwnMembership,
                Capability::ViewSchedule,
            ]);

        let staff = member
            .extend(3, GENERAL_DASHBOARD_ROUTE)
            .allow(&[
                RoutePattern::prefix("/staff/"),
                RoutePattern::prefix("/members/"),
                RoutePattern::prefix("/check-in/"),
                RoutePattern::prefix("/reports/"),
            ])
            .grant(&[
                Capability::CheckInMembers,
                Capability::ManageMembers,
                Capability::ManageClasses,
                Capability::ViewReports,
            ]);

        let admin = staff
            .extend(4, GENERAL_DASHBOARD_ROUTE)
            .allow(&[RoutePattern::prefix("/admin/")])
            .grant(&[
                Capability::ManageBilling,
                Capability::ManageStaff,
                Capability::ManageSettings,
            ]);

        let records = HashMap::from([
            (CanonicalRole::Inactive, inactive),
            (CanonicalRole::Nonmember, nonmember),
            (CanonicalRole::Member, member),
            (CanonicalRole::Staff, staff),
            (CanonicalRole::Admin, admin),
        ]);

        Self { records }
    }

    pub fn record(&self, role: CanonicalRole) -> Option<&RoleRecord> {
        self.records.get(&role)
    }
}
