// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::Request,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{
        require_authority, AuthorityRequirement, Claims, InvalidReason, Protected, VerifyRequest,
        VerifyResponse, ADMIN,
    },
    state::AppState,
};

pub mod health;
pub mod tokens;
pub mod users;

/// Build the HTTP surface of one service.
///
/// Every service serves the user and health routes. The token endpoint is
/// mounted only where an issuer exists, and the verification endpoint only
/// where tokens are verified locally.
pub fn router(state: AppState) -> Router {
    let admin_only = Protected::new(state.clone(), AuthorityRequirement::authority(ADMIN));

    let mut v1_routes = Router::new()
        .route("/users/me", get(users::get_current_user))
        .route(
            "/admin/users/{username}",
            get(users::get_user)
                .route_layer(middleware::from_fn_with_state(admin_only, require_authority)),
        );

    if state.issuer.is_some() {
        v1_routes = v1_routes.route("/auth/token", post(tokens::issue_token));
    }
    if state.gate.local_verifier().is_some() {
        v1_routes = v1_routes.route("/auth/verify", post(tokens::verify_token));
    }

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    let trace = TraceLayer::new_for_http().make_span_with(|req: &Request<axum::body::Body>| {
        let request_id = req
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("n/a");
        tracing::info_span!(
            "http_request",
            method = %req.method(),
            uri = %req.uri().path(),
            request_id = %request_id,
        )
    });

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(trace)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        tokens::issue_token,
        tokens::verify_token,
        users::get_current_user,
        users::get_user,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            Claims,
            InvalidReason,
            VerifyRequest,
            VerifyResponse,
            tokens::TokenRequest,
            tokens::TokenResponse,
            users::UserMeResponse,
            users::UserResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Token issuance and remote verification"),
        (name = "Users", description = "Caller identity"),
        (name = "Admin", description = "Operations requiring ADMIN"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
