// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, sync::Arc};

use gym_portal_auth::{
    api::router,
    clients::{
        self,
        http::{HttpIdentityProvider, HttpProfileStore, HttpSettingsSource},
        memory::{InMemoryIdentityProvider, InMemoryProfileStore, StaticSettings},
        ServiceEndpoint,
    },
    config::{PortalConfig, SeedAccount},
    guards::PromptSetting,
    logging,
    session::{
        GeneralSettings, IdentityProvider, OrchestratorOptions, PreferenceCache, ProfileStore,
        SessionOrchestrator, SettingsSource, UserProfile,
    },
    state::AppState,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("invalid bind address {0}")]
    BindAddress(String),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

struct Collaborators {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    settings: Arc<dyn SettingsSource>,
}

#[tokio::main]
async fn main() {
    let config = match PortalConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    logging::init(config.log_format);

    if let Err(e) = run(config).await {
        error!(error = %e, "Gym portal auth service failed");
        std::process::exit(1);
    }
}

async fn run(config: PortalConfig) -> Result<(), StartupError> {
    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .map_err(|_| StartupError::BindAddress(config.bind_address()))?;

    let collaborators = build_collaborators(&config)?;

    let session = Arc::new(SessionOrchestrator::new(
        collaborators.identity,
        collaborators.profiles,
        PreferenceCache::new(config.preference_capacity),
        OrchestratorOptions {
            ready_timeout: config.ready_timeout,
            fallback: config.fallback.clone(),
        },
    ));

    let shutdown = CancellationToken::new();
    let listener_task = session.start(shutdown.clone());

    let prompt = PromptSetting::pending();
    prompt.mount(collaborators.settings);

    let app = router(AppState::new(session, prompt));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, development = config.is_development(), "Gym portal auth listening (docs at /docs)");

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_signal().await;
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Err(e) = listener_task.await {
        warn!(error = %e, "Session listener ended abnormally");
    }
    info!("Shutdown complete");
    Ok(())
}

async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn build_collaborators(config: &PortalConfig) -> Result<Collaborators, StartupError> {
    let needs_http = config.identity_url.is_some()
        || config.profile_store_url.is_some()
        || config.settings_url.is_some();
    let http = if needs_http {
        Some(clients::http_client()?)
    } else {
        None
    };
    let endpoint = |url: &url::Url| ServiceEndpoint::new(url.clone(), config.api_key.clone());

    let mut memory_identity = None;
    let identity: Arc<dyn IdentityProvider> = match (&config.identity_url, &http) {
        (Some(url), Some(http)) => {
            info!(url = %url, "Using REST identity provider");
            Arc::new(HttpIdentityProvider::new(endpoint(url), http.clone()))
        }
        _ => {
            warn!("IDENTITY_URL not set, using in-memory identity provider (development mode)");
            let provider = Arc::new(InMemoryIdentityProvider::new());
            memory_identity = Some(provider.clone());
            provider
        }
    };

    let mut memory_profiles = None;
    let profiles: Arc<dyn ProfileStore> = match (&config.profile_store_url, &http) {
        (Some(url), Some(http)) => {
            info!(url = %url, "Using REST profile store");
            Arc::new(HttpProfileStore::new(endpoint(url), http.clone()))
        }
        _ => {
            info!("PROFILE_STORE_URL not set, using in-memory profile store");
            let store = Arc::new(InMemoryProfileStore::new());
            memory_profiles = Some(store.clone());
            store
        }
    };

    let settings: Arc<dyn SettingsSource> = match (&config.settings_url, &http) {
        (Some(url), Some(http)) => Arc::new(HttpSettingsSource::new(endpoint(url), http.clone())),
        _ => Arc::new(StaticSettings::new(GeneralSettings {
            nonmember_signup_prompt_enabled: config.nonmember_prompt_enabled,
            gym_name: None,
        })),
    };

    if let Some(account) = &config.seed_admin {
        match (&memory_identity, &memory_profiles) {
            (Some(identity), Some(profiles)) => seed_admin(account, identity, profiles),
            _ => warn!("SEED_ADMIN_EMAIL ignored: seeding needs the in-memory identity provider and profile store"),
        }
    }

    Ok(Collaborators {
        identity,
        profiles,
        settings,
    })
}

fn seed_admin(
    account: &SeedAccount,
    identity: &InMemoryIdentityProvider,
    profiles: &InMemoryProfileStore,
) {
    let id = identity.register(&account.email, &account.password);
    profiles.seed(UserProfile {
        id: id.clone(),
        email: Some(account.email.clone()),
        role: Some("admin".to_string()),
        status: Some("active".to_string()),
        first_name: None,
        last_name: None,
        created_at: Some(chrono::Utc::now()),
    });
    info!(user_id = %id, email = %account.email, "Seeded admin account");
}
