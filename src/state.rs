// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::iter;
use std::sync::Arc;

use chrono::Utc;

use crate::auth::{
    Gatekeeper, Principal, RemoteVerifier, TokenIssuer, TokenVerifier, VerificationOutcome,
};
use crate::config::{ConfigError, ServiceRole, Settings};
use crate::directory::{CredentialStore, InMemoryDirectory};

/// Shared, read-only state handed to every handler.
///
/// Everything in here is built once at startup; requests never mutate it.
#[derive(Clone)]
pub struct AppState {
    pub service_name: Arc<str>,
    pub gate: Arc<Gatekeeper>,
    /// Present only on the authority.
    pub issuer: Option<Arc<TokenIssuer>>,
    pub directory: Arc<dyn CredentialStore>,
}

impl AppState {
    pub fn new(service_name: impl Into<Arc<str>>, gate: Gatekeeper) -> Self {
        Self {
            service_name: service_name.into(),
            gate: Arc::new(gate),
            issuer: None,
            directory: Arc::new(InMemoryDirectory::new()),
        }
    }

    pub fn with_issuer(mut self, issuer: TokenIssuer) -> Self {
        self.issuer = Some(Arc::new(issuer));
        self
    }

    pub fn with_directory(mut self, directory: impl CredentialStore + 'static) -> Self {
        self.directory = Arc::new(directory);
        self
    }

    /// Build the state for one service process.
    ///
    /// - The authority must hold a signing key and verifies its own tokens
    ///   locally.
    /// - A resource service verifies locally when it has a verification key
    ///   and falls back to the authority's relay otherwise.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let local_key = settings.verification_key()?;

        let gate = match (settings.role, local_key, settings.authority_url.as_deref()) {
            (_, Some(key), _) => Gatekeeper::local(TokenVerifier::new(key)),
            (ServiceRole::Resource, None, Some(url)) => {
                Gatekeeper::remote(RemoteVerifier::new(url, settings.authority_timeout)?)
            }
            (role, None, _) => return Err(ConfigError::no_verification_path(role)),
        };

        let mut state = Self::new(settings.service_name.as_str(), gate);

        if settings.role == ServiceRole::Authority {
            let issuer = TokenIssuer::new(settings.signing_key()?, settings.token_ttl)?;
            if let Some(verifier) = state.gate.local_verifier() {
                check_key_pair(&issuer, verifier)?;
            }
            state = state.with_issuer(issuer);
        }

        if let Some(seed) = &settings.seed_users {
            let directory = InMemoryDirectory::from_seed(seed)?;
            tracing::info!(users = directory.len(), "Seeded user directory");
            state = state.with_directory(directory);
        }

        tracing::info!(
            service = %state.service_name,
            role = ?settings.role,
            verification = state.gate.path().name(),
            issues_tokens = state.issuer.is_some(),
            "Service state ready"
        );

        Ok(state)
    }
}

/// The authority must accept its own tokens; otherwise every token it issues
/// and every relayed verification would be rejected.
fn check_key_pair(issuer: &TokenIssuer, verifier: &TokenVerifier) -> Result<(), ConfigError> {
    let now = Utc::now().timestamp();
    let principal = Principal::new("startup-check", iter::empty::<String>());
    let token = issuer.issue_at(&principal, now)?;

    match verifier.verify(&token, now) {
        VerificationOutcome::Valid(_) => Ok(()),
        outcome => {
            tracing::error!(
                signing = ?issuer.algorithm(),
                verifying = ?verifier.algorithm(),
                outcome = outcome.label(),
                "Signing key does not match verification key"
            );
            Err(ConfigError::KeyMismatch {
                outcome: outcome.label(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthError, VerificationPath};
    use std::collections::HashMap;

    const SECRET_B64: &str = "a2tra2tra2tra2tra2tra2tra2tra2tra2tra2tra2tra2tra2traw==";
    const AUTHORITY_PEM: &str =
        concat!(env!("CARGO_MANIFEST_DIR"), "/src/auth/testdata/authority_ed25519.pem");
    const AUTHORITY_PUB_PEM: &str =
        concat!(env!("CARGO_MANIFEST_DIR"), "/src/auth/testdata/authority_ed25519.pub.pem");
    const ROGUE_PUB_PEM: &str =
        concat!(env!("CARGO_MANIFEST_DIR"), "/src/auth/testdata/rogue_ed25519.pub.pem");

    fn settings(vars: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned()).unwrap()
    }

    #[test]
    fn authority_issues_and_verifies_locally() {
        let state = AppState::from_settings(&settings(&[
            ("SERVICE_ROLE", "authority"),
            ("TOKEN_HMAC_SECRET", SECRET_B64),
        ]))
        .unwrap();

        assert!(state.issuer.is_some());
        assert!(matches!(state.gate.path(), VerificationPath::Local(_)));
    }

    #[test]
    fn authority_without_signing_key_refuses_to_start() {
        let result = AppState::from_settings(&settings(&[
            ("SERVICE_ROLE", "authority"),
            ("TOKEN_VERIFYING_KEY_PATH", AUTHORITY_PUB_PEM),
        ]));

        assert!(matches!(
            result,
            Err(ConfigError::Auth(AuthError::SigningUnavailable))
        ));
    }

    #[test]
    fn resource_with_key_verifies_locally() {
        let state =
            AppState::from_settings(&settings(&[("TOKEN_HMAC_SECRET", SECRET_B64)])).unwrap();

        assert!(state.issuer.is_none());
        assert_eq!(state.gate.path().name(), "local");
    }

    #[test]
    fn resource_without_key_uses_relay() {
        let state = AppState::from_settings(&settings(&[(
            "AUTHORITY_URL",
            "http://auth.internal:8080",
        )]))
        .unwrap();

        assert_eq!(state.gate.path().name(), "remote");
    }

    #[test]
    fn resource_without_any_path_refuses_to_start() {
        let result = AppState::from_settings(&settings(&[]));
        assert!(matches!(result, Err(ConfigError::NoVerificationPath { .. })));
    }

    #[test]
    fn authority_ignores_authority_url_without_key() {
        let result = AppState::from_settings(&settings(&[
            ("SERVICE_ROLE", "authority"),
            ("AUTHORITY_URL", "http://auth.internal:8080"),
        ]));
        let err = result.err().unwrap();
        assert!(matches!(err, ConfigError::NoVerificationPath { .. }));
        assert!(!err.to_string().contains("AUTHORITY_URL"));
    }

    #[test]
    fn authority_with_matching_ed25519_pair_starts() {
        let state = AppState::from_settings(&settings(&[
            ("SERVICE_ROLE", "authority"),
            ("TOKEN_SIGNING_KEY_PATH", AUTHORITY_PEM),
            ("TOKEN_VERIFYING_KEY_PATH", AUTHORITY_PUB_PEM),
        ]))
        .unwrap();

        assert!(state.issuer.is_some());
    }

    #[test]
    fn authority_signing_ed25519_but_verifying_hmac_refuses_to_start() {
        let result = AppState::from_settings(&settings(&[
            ("SERVICE_ROLE", "authority"),
            ("TOKEN_SIGNING_KEY_PATH", AUTHORITY_PEM),
            ("TOKEN_HMAC_SECRET", SECRET_B64),
        ]));

        assert!(matches!(
            result,
            Err(ConfigError::KeyMismatch {
                outcome: "bad-signature"
            })
        ));
    }

    #[test]
    fn authority_with_foreign_public_key_refuses_to_start() {
        let result = AppState::from_settings(&settings(&[
            ("SERVICE_ROLE", "authority"),
            ("TOKEN_SIGNING_KEY_PATH", AUTHORITY_PEM),
            ("TOKEN_VERIFYING_KEY_PATH", ROGUE_PUB_PEM),
        ]));

        assert!(matches!(result, Err(ConfigError::KeyMismatch { .. })));
    }

    #[test]
    fn seed_users_populate_directory() {
        let state = AppState::from_settings(&settings(&[
            ("TOKEN_HMAC_SECRET", SECRET_B64),
            ("SEED_USERS", "alice:pw:USER;root:pw:USER,ADMIN"),
        ]))
        .unwrap();

        let root = state.directory.authenticate("root", "pw").unwrap();
        assert!(root.authorities().contains("ADMIN"));
        assert!(state.directory.authenticate("alice", "wrong").is_none());
    }
}
