// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authority checks for verified callers.
//!
//! ## Model
//!
//! Authorities are flat strings. A requirement is satisfied only by an exact
//! member of the caller's authority set:
//!
//! - `ADMIN` does not imply `USER`
//! - no wildcards, no prefixes, no case folding

use std::fmt;

use super::claims::Claims;

/// Authority held by regular shop users.
pub const USER: &str = "USER";
/// Authority held by administrators.
pub const ADMIN: &str = "ADMIN";

/// The authority an operation requires, if any.
///
/// Attached to an operation's route definition and evaluated once per request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AuthorityRequirement {
    authority: Option<String>,
}

impl AuthorityRequirement {
    /// Open to any verified caller.
    pub fn any() -> Self {
        Self { authority: None }
    }

    /// Requires `authority`. An empty string means no requirement.
    pub fn authority(authority: impl Into<String>) -> Self {
        let authority = authority.into();
        Self {
            authority: (!authority.is_empty()).then_some(authority),
        }
    }

    pub fn required(&self) -> Option<&str> {
        self.authority.as_deref()
    }
}

impl fmt::Display for AuthorityRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.authority {
            Some(authority) => f.write_str(authority),
            None => f.write_str("<any>"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Decide whether verified `claims` satisfy `requirement`.
pub fn authorize(claims: &Claims, requirement: &AuthorityRequirement) -> Decision {
    match requirement.required() {
        None => Decision::Allow,
        Some(authority) if claims.has_authority(authority) => Decision::Allow,
        Some(_) => Decision::Deny,
    }
}
