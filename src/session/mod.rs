// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Module
//!
//! Keeps the portal's authenticated session in step with the external
//! identity provider and resolves it to an application profile.
//!
//! ## Flow
//!
//! 1. On startup the orchestrator asks the provider for an existing session
//! 2. A session is resolved to a profile (synthesized if the store has none)
//! 3. A fallback timer guarantees the auth-ready signal fires within a bound
//! 4. Sign-in, sign-out and token-refresh notifications update the user cell
//!    for the rest of the process lifetime
//!
//! ## Errors
//!
//! - Provider errors are surfaced to the caller as [`AuthError`]
//! - Profile-store errors are recovered by fallback profiles and only logged
//! - The readiness timeout is not an error

pub mod collaborators;
pub mod error;
pub mod orchestrator;
pub mod preferences;
pub mod profile;
pub mod ready;
pub mod types;

pub use collaborators::{IdentityProvider, ProfileStore, SettingsSource};
pub use error::{AuthError, ProfileError, SettingsError};
pub use orchestrator::{OrchestratorOptions, SessionOrchestrator, SessionSnapshot};
pub use preferences::PreferenceCache;
pub use profile::{FallbackProfile, ProfileResolver};
pub use ready::{ReadyCause, SessionPhase};
pub use types::{
    CurrentUser, GeneralSettings, PendingUser, ProfilePatch, ProfileSource, Session,
    SessionChange, SessionEvent, SignUpMetadata, UserProfile,
};
