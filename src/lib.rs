// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gym Portal Auth - Session & Role Policy Service
//!
//! Keeps the portal's signed-in session in step with the identity provider,
//! resolves it to a member/staff profile and decides which screens each role
//! may open.
//!
//! ## Modules
//!
//! - `policy` - Role table, role normalization and the route/permission evaluator
//! - `session` - Session orchestrator, profile resolution and the auth-ready gate
//! - `guards` - Authenticated and public route guards
//! - `clients` - In-memory and REST identity/profile/settings collaborators
//! - `api` - HTTP API handlers (Axum) for the view layer

pub mod api;
pub mod clients;
pub mod config;
pub mod error;
pub mod guards;
pub mod logging;
pub mod policy;
pub mod session;
pub mod state;
