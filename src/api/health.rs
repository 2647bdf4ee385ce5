// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::VerificationPath;
use crate::state::AppState;

/// Health check response with individual component status.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    /// Reporting service.
    pub service: String,
    /// Individual health checks and their results.
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// "local", or the authority's status when verifying remotely.
    pub verification: String,
    /// Signing key status. Only present on the authority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing: Option<String>,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Check that tokens can be verified right now.
async fn check_verification(state: &AppState) -> (bool, String) {
    match state.gate.path() {
        VerificationPath::Local(_) => (true, "local".to_string()),
        VerificationPath::Remote(relay) => {
            if relay.probe().await {
                (true, "ok".to_string())
            } else {
                (false, "unreachable".to_string())
            }
        }
    }
}

/// Health check endpoint handler.
///
/// Returns 200 if all checks pass, 503 if any check fails.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = ReadyResponse),
        (status = 503, description = "Service is unhealthy", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let (verification_ok, verification) = check_verification(&state).await;
    let signing = state.issuer.as_ref().map(|_| "ok".to_string());

    let response = ReadyResponse {
        status: if verification_ok { "ok" } else { "degraded" }.to_string(),
        service: state.service_name.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            verification,
            signing,
        },
    };

    let status = if verification_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
/// Does not check dependencies - use readiness for that.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe handler.
///
/// A relaying service is ready only while the authority answers.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(state: State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    health(state).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Gatekeeper, RemoteVerifier, TokenVerifier, VerificationKey};
    use std::time::Duration;

    #[tokio::test]
    async fn local_verification_is_healthy() {
        let state = AppState::new(
            "orders",
            Gatekeeper::local(TokenVerifier::new(
                VerificationKey::hmac(&[3u8; 32]).unwrap(),
            )),
        );

        let (status, Json(body)) = health(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.service, "orders");
        assert_eq!(body.checks.verification, "local");
        assert!(body.checks.signing.is_none());
    }

    #[tokio::test]
    async fn unreachable_authority_is_degraded() {
        // Bind and drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let relay =
            RemoteVerifier::new(&format!("http://{addr}"), Duration::from_millis(200)).unwrap();
        let state = AppState::new("orders", Gatekeeper::remote(relay));

        let (status, Json(body)) = readiness(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "degraded");
        assert_eq!(body.checks.verification, "unreachable");
    }
}
