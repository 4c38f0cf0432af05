// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Collaborator implementations.
//!
//! - [`memory`]: in-process identity provider, profile store and settings,
//!   used in development mode and as test fakes
//! - [`http`]: REST clients for a GoTrue-style identity service and a
//!   PostgREST-style data API

pub mod http;
pub mod memory;

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use url::Url;

/// Timeout applied to every collaborator request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Shared HTTP client for the REST collaborators.
pub fn http_client() -> Result<Client, reqwest::Error> {
    Client::builder().timeout(REQUEST_TIMEOUT).build()
}

/// Base URL of a collaborator service plus its API key.
#[derive(Clone)]
pub struct ServiceEndpoint {
    base: Url,
    api_key: Option<String>,
}

impl ServiceEndpoint {
    pub fn new(mut base: Url, api_key: Option<String>) -> Self {
        // Url::join replaces the last segment unless the base ends in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self {
            base,
            api_key: api_key.filter(|key| !key.is_empty()),
        }
    }

    /// Resolve `path` (which may carry a query string) against the base.
    pub fn url(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base.join(path.trim_start_matches('/'))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Attach the service API key (`apikey` header and bearer fallback).
    pub(crate) fn authorize(&self, request: RequestBuilder, bearer: Option<&str>) -> RequestBuilder {
        let request = match &self.api_key {
            Some(key) => request.header("apikey", key),
            None => request,
        };
        match bearer.or(self.api_key.as_deref()) {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

// The API key stays out of logs.
impl std::fmt::Debug for ServiceEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceEndpoint")
            .field("base", &self.base.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
