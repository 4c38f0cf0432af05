// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::clients::memory::{InMemoryIdentityProvider, InMemoryProfileStore};
use crate::guards::PromptSetting;
use crate::session::{OrchestratorOptions, PreferenceCache, SessionOrchestrator};

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionOrchestrator>,
    pub prompt: PromptSetting,
}

impl AppState {
    pub fn new(session: Arc<SessionOrchestrator>, prompt: PromptSetting) -> Self {
        Self { session, prompt }
    }
}

/// In-memory collaborators, prompt enabled. Initialization is not started.
impl Default for AppState {
    fn default() -> Self {
        let session = SessionOrchestrator::new(
            Arc::new(InMemoryIdentityProvider::new()),
            Arc::new(InMemoryProfileStore::new()),
            PreferenceCache::default(),
            OrchestratorOptions::default(),
        );
        Self::new(Arc::new(session), PromptSetting::loaded(true))
    }
}
