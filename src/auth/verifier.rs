// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local token verification.
//!
//! `verify` is a pure function of `(token, key, now)`: no I/O, no retries.
//! Forged and malformed tokens are expected input, so every failure comes
//! back as a [`VerificationOutcome`] rather than an error or a panic.

use std::fmt;

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::claims::{self, Claims, DecodeError, Token};
use super::keys::VerificationKey;

/// Why a token was rejected as invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidReason {
    /// Not a structurally valid token
    Malformed,
    /// Signature does not match the verification key
    BadSignature,
}

impl InvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidReason::Malformed => "malformed",
            InvalidReason::BadSignature => "bad-signature",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of verifying a token, locally or through the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Valid(Claims),
    Invalid(InvalidReason),
    Expired,
    /// The authority could not be asked. Remote path only.
    Unreachable,
}

impl VerificationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerificationOutcome::Valid(_))
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            VerificationOutcome::Valid(_) => "valid",
            VerificationOutcome::Invalid(reason) => reason.as_str(),
            VerificationOutcome::Expired => "expired",
            VerificationOutcome::Unreachable => "unreachable",
        }
    }
}

/// Verifies tokens with a locally held key.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    key: VerificationKey,
}

impl TokenVerifier {
    pub fn new(key: VerificationKey) -> Self {
        Self { key }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.key.algorithm()
    }

    /// Verify `token` against the held key at Unix time `now`.
    ///
    /// A token is expired once `exp <= now`.
    pub fn verify(&self, token: &Token, now: i64) -> VerificationOutcome {
        let claims = match claims::decode(token, &self.key) {
            Ok(claims) => claims,
            Err(DecodeError::Malformed) => {
                return VerificationOutcome::Invalid(InvalidReason::Malformed)
            }
            Err(DecodeError::BadSignature) => {
                return VerificationOutcome::Invalid(InvalidReason::BadSignature)
            }
        };

        if claims.exp <= now {
            return VerificationOutcome::Expired;
        }

        VerificationOutcome::Valid(claims)
    }
}
