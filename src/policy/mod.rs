// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Role Policy
//!
//! Static role table, raw-role normalization and the pure evaluator used by
//! the route guards.
//!
//! ## Layers
//!
//! 1. [`table`] - one immutable record per canonical role
//! 2. [`roles`] - raw role string → canonical role (total, never fails)
//! 3. [`evaluator`] - default routes, route access, permissions, hierarchy

pub mod evaluator;
pub mod roles;
pub mod routes;
pub mod table;

pub use evaluator::{
    accessible_patterns, can_access, compare, default_route, has_permission,
    has_permission_key, permissions, rank,
};
pub use roles::{CanonicalRole, FALLBACK_ROLE};
pub use routes::RoutePattern;
pub use table::{Capability, Permissions};
