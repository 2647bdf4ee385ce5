// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::verifier::InvalidReason;

/// Seconds a client should wait before retrying when the authority is down.
const RETRY_AFTER_SECS: &str = "5";

/// Authentication and authorization failures.
///
/// Every rejection of untrusted input is an ordinary value of this type; the
/// variants stay distinct so logs and tests can tell them apart even where
/// the HTTP status is the same.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No authorization header present
    #[error("Authorization header is required")]
    MissingAuthHeader,
    /// Authorization header is not `Bearer <token>`
    #[error("Invalid authorization header format (expected 'Bearer <token>')")]
    InvalidAuthHeader,
    /// Token cannot be parsed
    #[error("Token is malformed")]
    MalformedToken,
    /// Token parses but its signature does not match
    #[error("Token signature is invalid")]
    BadSignature,
    /// Signature is valid but the token is past its expiry
    #[error("Token has expired")]
    Expired,
    /// The authority service did not answer a remote verification
    #[error("Authority service is unreachable")]
    Unreachable,
    /// The issuer has no signing key loaded
    #[error("Token signing is unavailable")]
    SigningUnavailable,
    /// Verified caller lacks the authority the operation requires
    #[error("Insufficient authority for this operation")]
    InsufficientAuthority,
    /// Username/password rejected by the credential check
    #[error("Invalid username or password")]
    InvalidCredentials,
    /// Internal error
    #[error("Internal authentication error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::BadSignature => "bad_signature",
            AuthError::Expired => "token_expired",
            AuthError::Unreachable => "authority_unreachable",
            AuthError::SigningUnavailable => "signing_unavailable",
            AuthError::InsufficientAuthority => "insufficient_authority",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::MalformedToken
            | AuthError::BadSignature
            | AuthError::Expired
            | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientAuthority => StatusCode::FORBIDDEN,
            AuthError::Unreachable => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::SigningUnavailable | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<InvalidReason> for AuthError {
    fn from(reason: InvalidReason) -> Self {
        match reason {
            InvalidReason::Malformed => AuthError::MalformedToken,
            InvalidReason::BadSignature => AuthError::BadSignature,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });

        let mut response = (status, body).into_response();
        if matches!(self, AuthError::Unreachable) {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn missing_auth_returns_401() {
        let response = AuthError::MissingAuthHeader.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "missing_auth_header");
    }

    #[tokio::test]
    async fn insufficient_authority_returns_403() {
        let response = AuthError::InsufficientAuthority.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unreachable_suggests_retry() {
        let response = AuthError::Unreachable.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[RETRY_AFTER], "5");
    }

    #[test]
    fn token_rejections_share_a_status_but_not_a_code() {
        let rejections = [
            AuthError::MalformedToken,
            AuthError::BadSignature,
            AuthError::Expired,
        ];
        for error in &rejections {
            assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
        }
        assert_ne!(rejections[0].error_code(), rejections[1].error_code());
        assert_ne!(rejections[1].error_code(), rejections[2].error_code());
    }

    #[test]
    fn invalid_reasons_map_to_distinct_errors() {
        assert!(matches!(
            AuthError::from(InvalidReason::Malformed),
            AuthError::MalformedToken
        ));
        assert!(matches!(
            AuthError::from(InvalidReason::BadSignature),
            AuthError::BadSignature
        ));
    }
}
