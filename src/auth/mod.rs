// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! The token core shared by every shopfront service.
//!
//! ## Auth Flow
//!
//! 1. A caller obtains a token from the authority (`POST /v1/auth/token`)
//! 2. Every request to any service sends `Authorization: Bearer <token>`
//! 3. The receiving service:
//!    - verifies the token locally when it holds a verification key, or
//!    - asks the authority through the relay when it does not
//! 4. A valid token's authorities are checked against the operation's
//!    [`AuthorityRequirement`] before the handler runs
//!
//! ## Security
//!
//! - Only the authority holds a signing key
//! - Verification and authorization are pure over an immutable key
//! - No revocation: a token stays valid until its `exp`
//! - Expiry is inclusive: a token is expired once `exp <= now`

pub mod claims;
pub mod error;
pub mod extractor;
pub mod gate;
pub mod guard;
pub mod issuer;
pub mod keys;
pub mod middleware;
pub mod relay;
pub mod verifier;

pub use claims::{Claims, Principal, Token};
pub use error::AuthError;
pub use extractor::{bearer_token, Auth};
pub use gate::{Gatekeeper, VerificationPath};
pub use guard::{authorize, AuthorityRequirement, Decision, ADMIN, USER};
pub use issuer::{TokenIssuer, DEFAULT_TOKEN_TTL};
pub use keys::{decode_base64_secret, KeyError, SigningKey, VerificationKey};
pub use middleware::{require_authority, Protected};
pub use relay::{RelayError, RemoteVerifier, VerifyRequest, VerifyResponse, DEFAULT_RELAY_TIMEOUT};
pub use verifier::{InvalidReason, TokenVerifier, VerificationOutcome};
