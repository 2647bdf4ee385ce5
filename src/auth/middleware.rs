// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authority requirements attached to routes.
//!
//! Each protected operation declares its [`AuthorityRequirement`] as data on
//! its route:
//!
//! ```rust,ignore
//! get(users::get_user).route_layer(axum::middleware::from_fn_with_state(
//!     Protected::new(state.clone(), AuthorityRequirement::authority(ADMIN)),
//!     require_authority,
//! ))
//! ```
//!
//! Admitted claims are stored in the request extensions, where the
//! [`super::Auth`] extractor finds them.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use super::extractor::bearer_token;
use super::AuthorityRequirement;
use crate::state::AppState;

/// Middleware state: the app state plus the route's requirement.
#[derive(Clone)]
pub struct Protected {
    state: AppState,
    requirement: AuthorityRequirement,
}

impl Protected {
    pub fn new(state: AppState, requirement: AuthorityRequirement) -> Self {
        Self { state, requirement }
    }

    pub fn requirement(&self) -> &AuthorityRequirement {
        &self.requirement
    }
}

/// Admit the request or reject it with the mapped [`super::AuthError`].
pub async fn require_authority(
    State(protected): State<Protected>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(request.headers()) {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };

    let admitted = protected
        .state
        .gate
        .admit(&token, Utc::now().timestamp(), &protected.requirement)
        .await;

    match admitted {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        Auth, Gatekeeper, Principal, SigningKey, TokenIssuer, TokenVerifier, VerificationKey,
        ADMIN, USER,
    };
    use axum::{
        body::Body,
        http::{self, StatusCode},
        routing::get,
        Router,
    };
    use std::time::Duration;
    use tower::ServiceExt;

    const SECRET: &[u8] = b"middleware-test-secret-middleware-test";

    fn app() -> Router {
        let gate = Gatekeeper::local(TokenVerifier::new(VerificationKey::hmac(SECRET).unwrap()));
        let state = AppState::new("test", gate);
        let protected = Protected::new(state.clone(), AuthorityRequirement::authority(ADMIN));

        Router::new()
            .route(
                "/admin",
                get(|Auth(claims): Auth| async move { claims.sub }).route_layer(
                    axum::middleware::from_fn_with_state(protected, require_authority),
                ),
            )
            .with_state(state)
    }

    fn bearer(authorities: &[&str]) -> String {
        let key = SigningKey::hmac(SECRET).unwrap();
        let token = TokenIssuer::new(Some(key), Duration::from_secs(60))
            .unwrap()
            .issue(&Principal::new("caller", authorities.iter().copied()))
            .unwrap();
        format!("Bearer {}", token.as_str())
    }

    async fn status_for(header: Option<String>) -> StatusCode {
        let mut request = http::Request::builder().uri("/admin");
        if let Some(header) = header {
            request = request.header("Authorization", header);
        }
        app()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn admin_is_admitted() {
        assert_eq!(status_for(Some(bearer(&[ADMIN]))).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn user_is_forbidden() {
        assert_eq!(status_for(Some(bearer(&[USER]))).await, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        assert_eq!(status_for(None).await, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn protected_keeps_its_requirement() {
        let gate = Gatekeeper::local(TokenVerifier::new(VerificationKey::hmac(SECRET).unwrap()));
        let protected = Protected::new(
            AppState::new("test", gate),
            AuthorityRequirement::authority(USER),
        );
        assert_eq!(protected.requirement().required(), Some(USER));
    }
}
