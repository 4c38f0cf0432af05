// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, Query},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::policy::{self, CanonicalRole, Permissions};

#[derive(Debug, Deserialize, IntoParams)]
pub struct PolicyQuery {
    /// Optional route to evaluate for this role.
    pub route: Option<String>,
}

/// Everything the view layer needs to render navigation for a role.
#[derive(Debug, Serialize, ToSchema)]
pub struct RolePolicyResponse {
    /// Role as given in the request path
    pub raw_role: String,
    pub role: CanonicalRole,
    pub rank: u8,
    pub default_route: String,
    /// Accessible route patterns, `*` marking a prefix wildcard
    pub patterns: Vec<String>,
    pub permissions: Permissions,
    /// Present when `route` was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_allowed: Option<bool>,
}

/// Resolve a raw role string through the policy table.
///
/// Never fails: unknown roles resolve to the fallback role.
#[utoipa::path(
    get,
    path = "/v1/policy/{role}",
    params(
        ("role" = String, Path, description = "Raw role string, e.g. `Administrator`"),
        PolicyQuery
    ),
    tag = "Policy",
    responses((status = 200, body = RolePolicyResponse))
)]
pub async fn get_role_policy(
    Path(raw_role): Path<String>,
    Query(query): Query<PolicyQuery>,
) -> Json<RolePolicyResponse> {
    let role = CanonicalRole::normalize(Some(&raw_role));

    Json(RolePolicyResponse {
        role,
        rank: policy::rank(role),
        default_route: policy::default_route(role).to_string(),
        patterns: policy::accessible_patterns(role)
            .iter()
            .map(|pattern| pattern.render())
            .collect(),
        permissions: policy::permissions(role),
        route_allowed: query.route.as_deref().map(|route| policy::can_access(route, role)),
        raw_role,
    })
}
