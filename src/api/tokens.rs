// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token endpoints served by the authority.
//!
//! - `POST /v1/auth/token` exchanges credentials for a signed token
//! - `POST /v1/auth/verify` answers remote verification requests from
//!   services that hold no key

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::{AuthError, Token, VerifyRequest, VerifyResponse},
    error::ApiError,
    state::AppState,
};

/// Credentials for `POST /v1/auth/token`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

/// A freshly issued token.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    /// Signed bearer token
    pub access_token: String,
    /// Always `Bearer`
    pub token_type: String,
    /// Seconds until the token expires
    pub expires_in: u64,
}

/// Exchange a username and password for a signed token.
#[utoipa::path(
    post,
    path = "/v1/auth/token",
    tag = "Auth",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Missing username or password"),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Signing key unavailable")
    )
)]
pub async fn issue_token(
    State(state): State<AppState>,
    Json(request): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    if request.username.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("username and password are required"));
    }

    let issuer = state.issuer.as_ref().ok_or(AuthError::SigningUnavailable)?;

    let principal = state
        .directory
        .authenticate(&request.username, &request.password)
        .ok_or_else(|| {
            tracing::warn!(username = %request.username, "Rejected credentials");
            AuthError::InvalidCredentials
        })?;

    let token = issuer.issue(&principal)?;
    tracing::info!(
        subject = %principal.subject(),
        authorities = ?principal.authorities(),
        "Issued token"
    );

    Ok(Json(TokenResponse {
        access_token: token.into_inner(),
        token_type: "Bearer".to_string(),
        expires_in: issuer.ttl().as_secs(),
    }))
}

/// Verify a token on behalf of a service without a verification key.
///
/// Always answers 200 with the outcome; only transport failures mean the
/// authority could not decide.
#[utoipa::path(
    post,
    path = "/v1/auth/verify",
    tag = "Auth",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Verification outcome", body = VerifyResponse),
        (status = 404, description = "This service does not verify for others")
    )
)]
pub async fn verify_token(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let verifier = state
        .gate
        .local_verifier()
        .ok_or_else(|| ApiError::not_found("remote verification is not served here"))?;

    let outcome = verifier.verify(&Token::new(request.token), Utc::now().timestamp());
    tracing::debug!(outcome = outcome.label(), "Answered remote verification");

    VerifyResponse::from_outcome(outcome).map(Json).ok_or_else(|| {
        AuthError::Internal("local verification has no unreachable outcome".into()).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        Gatekeeper, InvalidReason, RemoteVerifier, SigningKey, TokenIssuer, TokenVerifier,
        VerificationKey, ADMIN, USER,
    };
    use crate::directory::InMemoryDirectory;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use std::time::Duration;

    const SECRET: &[u8] = b"token-endpoint-secret-token-endpoint";

    fn authority() -> AppState {
        let mut directory = InMemoryDirectory::new();
        directory.insert_user("alice", "wonderland", [USER]);
        directory.insert_user("root", "toor", [USER, ADMIN]);

        AppState::new(
            "auth",
            Gatekeeper::local(TokenVerifier::new(VerificationKey::hmac(SECRET).unwrap())),
        )
        .with_issuer(
            TokenIssuer::new(Some(SigningKey::hmac(SECRET).unwrap()), Duration::from_secs(600))
                .unwrap(),
        )
        .with_directory(directory)
    }

    fn credentials(username: &str, password: &str) -> Json<TokenRequest> {
        Json(TokenRequest {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    #[tokio::test]
    async fn issues_token_for_valid_credentials() {
        let state = authority();
        let Json(response) = issue_token(State(state.clone()), credentials("root", "toor"))
            .await
            .unwrap();

        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.expires_in, 600);

        let Json(verified) = verify_token(
            State(state),
            Json(VerifyRequest {
                token: response.access_token,
            }),
        )
        .await
        .unwrap();

        match verified {
            VerifyResponse::Valid { claims } => {
                assert_eq!(claims.sub, "root");
                assert!(claims.has_authority(ADMIN));
            }
            other => panic!("expected valid, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let err = issue_token(State(authority()), credentials("alice", "nope"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn empty_credentials_are_bad_request() {
        let err = issue_token(State(authority()), credentials(" ", "x"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn service_without_issuer_cannot_sign() {
        let state = AppState::new(
            "orders",
            Gatekeeper::local(TokenVerifier::new(VerificationKey::hmac(SECRET).unwrap())),
        );
        let err = issue_token(State(state), credentials("alice", "wonderland"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn verify_reports_malformed_tokens() {
        let Json(verified) = verify_token(
            State(authority()),
            Json(VerifyRequest {
                token: "garbage".to_string(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(
            verified,
            VerifyResponse::Invalid {
                reason: InvalidReason::Malformed
            }
        );
    }

    #[tokio::test]
    async fn relaying_service_does_not_answer_verify() {
        let relay =
            RemoteVerifier::new("http://127.0.0.1:9", Duration::from_millis(100)).unwrap();
        let state = AppState::new("orders", Gatekeeper::remote(relay));

        let err = verify_token(
            State(state),
            Json(VerifyRequest {
                token: "anything".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
