// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The admission pipeline every protected request runs through.
//!
//! 1. Verify the token on this service's [`VerificationPath`]
//! 2. Only for a `Valid` outcome, run the authorization guard
//! 3. Return the claims, or a typed [`AuthError`] for the boundary to map

use super::claims::{Claims, Token};
use super::error::AuthError;
use super::guard::{authorize, AuthorityRequirement, Decision};
use super::relay::RemoteVerifier;
use super::verifier::{TokenVerifier, VerificationOutcome};

/// How this service verifies tokens.
///
/// A service holding a verification key verifies locally; a service without
/// one must delegate to the authority.
#[derive(Debug, Clone)]
pub enum VerificationPath {
    Local(TokenVerifier),
    Remote(RemoteVerifier),
}

impl VerificationPath {
    pub fn name(&self) -> &'static str {
        match self {
            VerificationPath::Local(_) => "local",
            VerificationPath::Remote(_) => "remote",
        }
    }

    pub async fn verify(&self, token: &Token, now: i64) -> VerificationOutcome {
        match self {
            VerificationPath::Local(verifier) => verifier.verify(token, now),
            VerificationPath::Remote(relay) => relay.verify_remote(token).await,
        }
    }
}

/// Verifies tokens and checks authority requirements.
#[derive(Debug, Clone)]
pub struct Gatekeeper {
    path: VerificationPath,
}

impl Gatekeeper {
    pub fn new(path: VerificationPath) -> Self {
        Self { path }
    }

    pub fn local(verifier: TokenVerifier) -> Self {
        Self::new(VerificationPath::Local(verifier))
    }

    pub fn remote(relay: RemoteVerifier) -> Self {
        Self::new(VerificationPath::Remote(relay))
    }

    pub fn path(&self) -> &VerificationPath {
        &self.path
    }

    /// The local verifier, when this service holds a key.
    pub fn local_verifier(&self) -> Option<&TokenVerifier> {
        match &self.path {
            VerificationPath::Local(verifier) => Some(verifier),
            VerificationPath::Remote(_) => None,
        }
    }

    /// Admit a request carrying `token` at Unix time `now` for an operation
    /// declaring `requirement`.
    pub async fn admit(
        &self,
        token: &Token,
        now: i64,
        requirement: &AuthorityRequirement,
    ) -> Result<Claims, AuthError> {
        let claims = match self.path.verify(token, now).await {
            VerificationOutcome::Valid(claims) => claims,
            VerificationOutcome::Invalid(reason) => {
                tracing::debug!(path = self.path.name(), %reason, "Rejected token");
                return Err(reason.into());
            }
            VerificationOutcome::Expired => {
                tracing::debug!(path = self.path.name(), "Rejected expired token");
                return Err(AuthError::Expired);
            }
            VerificationOutcome::Unreachable => {
                tracing::warn!("Authority unreachable, rejecting request");
                return Err(AuthError::Unreachable);
            }
        };

        match authorize(&claims, requirement) {
            Decision::Allow => Ok(claims),
            Decision::Deny => {
                tracing::warn!(
                    subject = %claims.sub,
                    required = %requirement,
                    "Denied: insufficient authority"
                );
                Err(AuthError::InsufficientAuthority)
            }
        }
    }
}
