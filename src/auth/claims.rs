// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Principals, claims and the signed token encoding.
//!
//! Authorities are held in a `BTreeSet`, so the serialized payload is the same
//! for any insertion order. That keeps the signed bytes canonical.

use std::collections::BTreeSet;
use std::fmt;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Header;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::keys::{SigningKey, VerificationKey};

/// An authenticated identity.
///
/// Built after the credential check succeeds and never changed while a
/// request is being handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    subject: String,
    authorities: BTreeSet<String>,
}

impl Principal {
    pub fn new<I, S>(subject: impl Into<String>, authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            subject: subject.into(),
            authorities: authorities.into_iter().map(Into::into).collect(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn authorities(&self) -> &BTreeSet<String> {
        &self.authorities
    }
}

/// Decoded token content.
///
/// Only produced by a successful verification, local or remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Granted authorities, e.g. `USER`, `ADMIN`
    pub authorities: BTreeSet<String>,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Absolute expiry (Unix seconds)
    pub exp: i64,
    /// Unique token id
    pub jti: String,
}

impl Claims {
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }

    pub fn principal(&self) -> Principal {
        Principal {
            subject: self.sub.clone(),
            authorities: self.authorities.clone(),
        }
    }
}

/// A compact signed token.
///
/// Opaque outside this module: the only way to read its content is through a
/// verifier.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for Token {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for Token {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

// Tokens are bearer credentials; keep them out of logs.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(..)")
    }
}

/// Why a token could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecodeError {
    Malformed,
    BadSignature,
}

/// Sign `principal` into a fresh token.
pub(crate) fn encode(
    principal: &Principal,
    issued_at: i64,
    expires_at: i64,
    key: &SigningKey,
) -> Result<Token, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: principal.subject.clone(),
        authorities: principal.authorities.clone(),
        iat: issued_at,
        exp: expires_at,
        jti: Uuid::new_v4().to_string(),
    };

    jsonwebtoken::encode(&Header::new(key.algorithm()), &claims, key.encoding_key()).map(Token)
}

/// Check the signature and decode the payload. Expiry is not checked here.
pub(crate) fn decode(token: &Token, key: &VerificationKey) -> Result<Claims, DecodeError> {
    jsonwebtoken::decode::<Claims>(token.as_str(), key.decoding_key(), key.validation())
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            // A token for another algorithm cannot be checked with our key.
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => DecodeError::BadSignature,
            _ => DecodeError::Malformed,
        })
}
