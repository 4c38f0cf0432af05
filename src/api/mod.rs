// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    guards::{GuardDecision, RedirectReason},
    policy::{CanonicalRole, Permissions},
    session::{
        CurrentUser, PendingUser, ProfileSource, ReadyCause, SessionPhase, SessionSnapshot,
        UserProfile,
    },
    state::AppState,
};

pub mod guards;
pub mod health;
pub mod policy;
pub mod preferences;
pub mod session;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/session", get(session::get_session))
        .route("/auth/login", post(session::login))
        .route("/auth/signup", post(session::signup))
        .route("/auth/logout", post(session::logout))
        .route("/guards/authenticated", post(guards::check_authenticated))
        .route("/guards/public", post(guards::check_public))
        .route("/policy/{role}", get(policy::get_role_policy))
        .route(
            "/preferences/{key}",
            get(preferences::get_preference)
                .put(preferences::put_preference)
                .delete(preferences::delete_preference),
        )
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        session::get_session,
        session::login,
        session::signup,
        session::logout,
        guards::check_authenticated,
        guards::check_public,
        policy::get_role_policy,
        preferences::get_preference,
        preferences::put_preference,
        preferences::delete_preference
    ),
    components(
        schemas(
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            session::LoginRequest,
            session::SignupRequest,
            session::LogoutFailure,
            guards::AuthenticatedGuardRequest,
            guards::PublicGuardRequest,
            policy::RolePolicyResponse,
            SessionSnapshot,
            SessionPhase,
            ReadyCause,
            CurrentUser,
            UserProfile,
            ProfileSource,
            PendingUser,
            CanonicalRole,
            Permissions,
            GuardDecision,
            RedirectReason
        )
    ),
    tags(
        (name = "Health", description = "Liveness and session readiness"),
        (name = "Session", description = "Sign-in, sign-up, sign-out and the current user"),
        (name = "Guards", description = "Route guard decisions for the view layer"),
        (name = "Policy", description = "Role policy lookups"),
        (name = "Preferences", description = "Client-side preference state")
    )
)]
struct ApiDoc;
