// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential check collaborator.
//!
//! The authority only mints tokens for principals that passed a credential
//! check. Password storage itself is not this crate's concern.
//!
//! [`InMemoryDirectory`] is for development deployments and tests only. It
//! keeps unsalted SHA-256 digests, which do not resist offline guessing;
//! production authorities should plug in a [`CredentialStore`] backed by a
//! real user service. Digests are still compared in constant time.

use std::collections::{BTreeSet, HashMap};

use sha2::{Digest, Sha256};

use crate::auth::Principal;

/// Looks up and authenticates users.
pub trait CredentialStore: Send + Sync {
    /// Return the principal if `password` matches `username`.
    fn authenticate(&self, username: &str, password: &str) -> Option<Principal>;

    /// Return the principal for `username` without checking credentials.
    fn lookup(&self, username: &str) -> Option<Principal>;
}

/// Invalid `SEED_USERS` entry.
#[derive(Debug, thiserror::Error)]
#[error("invalid user seed entry `{0}` (expected name:password:AUTHORITY[,AUTHORITY...])")]
pub struct SeedError(pub String);

struct UserRecord {
    password_digest: [u8; 32],
    authorities: BTreeSet<String>,
}

#[derive(Default)]
pub struct InMemoryDirectory {
    users: HashMap<String, UserRecord>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `name:password:AUTH1,AUTH2;name2:...`.
    ///
    /// The password is everything between the first and the last colon.
    pub fn from_seed(seed: &str) -> Result<Self, SeedError> {
        let mut directory = Self::new();

        for entry in seed.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, rest) = entry
                .split_once(':')
                .ok_or_else(|| SeedError(entry.to_string()))?;
            let (password, authorities) = rest
                .rsplit_once(':')
                .ok_or_else(|| SeedError(entry.to_string()))?;
            if name.is_empty() || password.is_empty() {
                return Err(SeedError(entry.to_string()));
            }

            let authorities = authorities
                .split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty());
            directory.insert_user(name, password, authorities);
        }

        Ok(directory)
    }

    pub fn insert_user<I, S>(&mut self, username: &str, password: &str, authorities: I) -> Principal
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let principal = Principal::new(username, authorities);
        self.users.insert(
            username.to_string(),
            UserRecord {
                password_digest: digest(password),
                authorities: principal.authorities().clone(),
            },
        );
        principal
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl CredentialStore for InMemoryDirectory {
    fn authenticate(&self, username: &str, password: &str) -> Option<Principal> {
        let record = self.users.get(username)?;
        constant_time_eq(&record.password_digest, &digest(password))
            .then(|| Principal::new(username, record.authorities.iter().cloned()))
    }

    fn lookup(&self, username: &str) -> Option<Principal> {
        self.users
            .get(username)
            .map(|record| Principal::new(username, record.authorities.iter().cloned()))
    }
}

fn digest(password: &str) -> [u8; 32] {
    Sha256::digest(password.as_bytes()).into()
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
