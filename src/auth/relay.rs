// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Remote verification relay.
//!
//! Services that hold no verification key forward the raw token to the
//! authority's `POST /v1/auth/verify` endpoint and take its answer as ground
//! truth.
//!
//! ## Failure model
//!
//! - Every call is bounded by the configured timeout
//! - Timeouts, connection failures, non-2xx statuses and undecodable answers
//!   all become [`VerificationOutcome::Unreachable`], never `Invalid`
//! - No retries: retry policy belongs to the caller

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

use super::claims::{Claims, Token};
use super::verifier::{InvalidReason, VerificationOutcome};

/// Path of the authority's verification endpoint.
pub const VERIFY_PATH: &str = "/v1/auth/verify";

/// Default per-call timeout (2 seconds).
pub const DEFAULT_RELAY_TIMEOUT: Duration = Duration::from_secs(2);

/// Body of a remote verification request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyRequest {
    /// Raw bearer token
    pub token: String,
}

/// The authority's answer. Network failure is the implicit fourth outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerifyResponse {
    Valid { claims: Claims },
    Invalid { reason: InvalidReason },
    Expired,
}

impl VerifyResponse {
    /// Wire form of a local outcome. `Unreachable` has none.
    pub fn from_outcome(outcome: VerificationOutcome) -> Option<Self> {
        match outcome {
            VerificationOutcome::Valid(claims) => Some(VerifyResponse::Valid { claims }),
            VerificationOutcome::Invalid(reason) => Some(VerifyResponse::Invalid { reason }),
            VerificationOutcome::Expired => Some(VerifyResponse::Expired),
            VerificationOutcome::Unreachable => None,
        }
    }

    pub fn into_outcome(self) -> VerificationOutcome {
        match self {
            VerifyResponse::Valid { claims } => VerificationOutcome::Valid(claims),
            VerifyResponse::Invalid { reason } => VerificationOutcome::Invalid(reason),
            VerifyResponse::Expired => VerificationOutcome::Expired,
        }
    }
}

/// Errors building a relay at startup.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("invalid authority URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("authority URL must use http or https, got `{0}`")]
    UnsupportedScheme(String),
    #[error("failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Asks the authority service to verify tokens this service cannot check.
#[derive(Debug, Clone)]
pub struct RemoteVerifier {
    /// Full URL of the verification endpoint
    endpoint: Url,
    /// Per-call timeout
    timeout: Duration,
    /// HTTP client
    client: reqwest::Client,
}

impl RemoteVerifier {
    /// Create a relay for the authority at `authority_url`.
    ///
    /// # Arguments
    /// - `authority_url`: base URL of the authority, e.g. `http://user-service:8080`
    /// - `timeout`: bound applied to every verification call
    pub fn new(authority_url: &str, timeout: Duration) -> Result<Self, RelayError> {
        let mut base = Url::parse(authority_url)?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(RelayError::UnsupportedScheme(base.scheme().to_string()));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join(VERIFY_PATH.trim_start_matches('/'))?;

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint,
            timeout,
            client,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Ask the authority to verify `token`.
    pub async fn verify_remote(&self, token: &Token) -> VerificationOutcome {
        let request = VerifyRequest {
            token: token.as_str().to_owned(),
        };

        let response = match self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    endpoint = %self.endpoint,
                    timed_out = e.is_timeout(),
                    error = %e,
                    "Remote verification call failed"
                );
                return VerificationOutcome::Unreachable;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                endpoint = %self.endpoint,
                %status,
                "Authority answered verification with an error status"
            );
            return VerificationOutcome::Unreachable;
        }

        match response.json::<VerifyResponse>().await {
            Ok(answer) => answer.into_outcome(),
            Err(e) => {
                tracing::warn!(
                    endpoint = %self.endpoint,
                    timed_out = e.is_timeout(),
                    error = %e,
                    "Could not read authority verification answer"
                );
                VerificationOutcome::Unreachable
            }
        }
    }

    /// Check whether the authority answers at all.
    ///
    /// Sends an empty token; any decodable verdict means the authority is up.
    pub async fn probe(&self) -> bool {
        !matches!(
            self.verify_remote(&Token::from("")).await,
            VerificationOutcome::Unreachable
        )
    }
}
