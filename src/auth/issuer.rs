// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token issuance. Only the authority service constructs a [`TokenIssuer`].

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::Algorithm;

use super::claims::{self, Principal, Token};
use super::error::AuthError;
use super::keys::SigningKey;

/// Default lifetime of issued tokens (1 hour).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// Mints signed tokens for principals that already passed the credential check.
///
/// Stateless: nothing is recorded per issued token.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    key: SigningKey,
    ttl: Duration,
}

impl TokenIssuer {
    /// Fails with [`AuthError::SigningUnavailable`] when no key was loaded.
    /// Callers treat that as a startup failure.
    pub fn new(key: Option<SigningKey>, ttl: Duration) -> Result<Self, AuthError> {
        let key = key.ok_or(AuthError::SigningUnavailable)?;
        Ok(Self { key, ttl })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn algorithm(&self) -> Algorithm {
        self.key.algorithm()
    }

    /// Issue a token valid from now for the configured TTL.
    pub fn issue(&self, principal: &Principal) -> Result<Token, AuthError> {
        self.issue_at(principal, Utc::now().timestamp())
    }

    /// Issue a token with an explicit issued-at time (Unix seconds).
    pub fn issue_at(&self, principal: &Principal, issued_at: i64) -> Result<Token, AuthError> {
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = issued_at.saturating_add(ttl);

        let token = claims::encode(principal, issued_at, expires_at, &self.key)
            .map_err(|e| AuthError::Internal(format!("failed to sign token: {e}")))?;

        tracing::debug!(
            subject = %principal.subject(),
            expires_at,
            "Issued token"
        );
        Ok(token)
    }
}
