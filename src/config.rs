// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Every service reads its settings from the environment once at startup.
//! Only the key material and the role differ between deployments.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `SERVICE_NAME` | Name reported in logs and health checks | `auth` |
//! | `SERVICE_ROLE` | `authority` (issues tokens) or `resource` | `resource` |
//! | `TOKEN_HMAC_SECRET` | Base64 HS256 secret for signing and verifying | - |
//! | `TOKEN_SIGNING_KEY_PATH` | Ed25519 PKCS#8 private key PEM (authority) | - |
//! | `TOKEN_VERIFYING_KEY_PATH` | Ed25519 public key PEM | - |
//! | `TOKEN_TTL_SECS` | Lifetime of issued tokens | `3600` |
//! | `AUTHORITY_URL` | Authority base URL for remote verification | - |
//! | `AUTHORITY_TIMEOUT_MS` | Per-call remote verification timeout | `2000` |
//! | `SEED_USERS` | `name:password:AUTH1,AUTH2;...` for the user directory | - |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//!
//! ## Verification path
//!
//! A service verifies locally when it has a verification key (the HMAC
//! secret or the Ed25519 public key). Otherwise a resource service with
//! `AUTHORITY_URL` delegates to the authority. Anything else refuses to start.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::auth::{
    decode_base64_secret, AuthError, KeyError, RelayError, SigningKey, VerificationKey,
    DEFAULT_RELAY_TIMEOUT, DEFAULT_TOKEN_TTL,
};
use crate::directory::SeedError;
use crate::observability::LogFormat;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const SERVICE_NAME_ENV: &str = "SERVICE_NAME";
pub const SERVICE_ROLE_ENV: &str = "SERVICE_ROLE";
pub const TOKEN_HMAC_SECRET_ENV: &str = "TOKEN_HMAC_SECRET";
pub const TOKEN_SIGNING_KEY_PATH_ENV: &str = "TOKEN_SIGNING_KEY_PATH";
pub const TOKEN_VERIFYING_KEY_PATH_ENV: &str = "TOKEN_VERIFYING_KEY_PATH";
pub const TOKEN_TTL_SECS_ENV: &str = "TOKEN_TTL_SECS";
pub const AUTHORITY_URL_ENV: &str = "AUTHORITY_URL";
pub const AUTHORITY_TIMEOUT_MS_ENV: &str = "AUTHORITY_TIMEOUT_MS";
pub const SEED_USERS_ENV: &str = "SEED_USERS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SERVICE_NAME: &str = "auth";

/// Startup configuration errors. All of them stop the process.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {name}")]
    InvalidValue { name: &'static str, value: String },
    #[error("no verification path: set {hint}")]
    NoVerificationPath { hint: &'static str },
    #[error("signing and verification keys do not match (own token verified as {outcome})")]
    KeyMismatch { outcome: &'static str },
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error(transparent)]
    Seed(#[from] SeedError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ConfigError {
    /// Missing verification path, naming only the variables `role` honours.
    pub fn no_verification_path(role: ServiceRole) -> Self {
        let hint = match role {
            ServiceRole::Authority => "TOKEN_HMAC_SECRET or TOKEN_VERIFYING_KEY_PATH",
            ServiceRole::Resource => "TOKEN_HMAC_SECRET, TOKEN_VERIFYING_KEY_PATH or AUTHORITY_URL",
        };
        ConfigError::NoVerificationPath { hint }
    }
}

/// Whether this process mints tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceRole {
    /// Holds the signing key and serves the token and verification endpoints
    Authority,
    /// Only consumes tokens
    Resource,
}

impl FromStr for ServiceRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "authority" => Ok(ServiceRole::Authority),
            "resource" => Ok(ServiceRole::Resource),
            _ => Err(()),
        }
    }
}

/// Settings for one service process.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub service_name: String,
    pub role: ServiceRole,
    pub hmac_secret: Option<Vec<u8>>,
    pub signing_key_path: Option<PathBuf>,
    pub verifying_key_path: Option<PathBuf>,
    pub token_ttl: Duration,
    pub authority_url: Option<String>,
    pub authority_timeout: Duration,
    pub seed_users: Option<String>,
    pub log_format: LogFormat,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let role = match get(SERVICE_ROLE_ENV) {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                name: SERVICE_ROLE_ENV,
                value,
            })?,
            None => ServiceRole::Resource,
        };

        let log_format = match get(LOG_FORMAT_ENV) {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                name: LOG_FORMAT_ENV,
                value,
            })?,
            None => LogFormat::Pretty,
        };

        let hmac_secret = get(TOKEN_HMAC_SECRET_ENV)
            .map(|value| decode_base64_secret(&value))
            .transpose()?;

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(get(PORT_ENV), PORT_ENV, DEFAULT_PORT)?,
            service_name: get(SERVICE_NAME_ENV)
                .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
            role,
            hmac_secret,
            signing_key_path: get(TOKEN_SIGNING_KEY_PATH_ENV).map(PathBuf::from),
            verifying_key_path: get(TOKEN_VERIFYING_KEY_PATH_ENV).map(PathBuf::from),
            token_ttl: Duration::from_secs(parse_nonzero(
                get(TOKEN_TTL_SECS_ENV),
                TOKEN_TTL_SECS_ENV,
                DEFAULT_TOKEN_TTL.as_secs(),
            )?),
            authority_url: get(AUTHORITY_URL_ENV),
            authority_timeout: Duration::from_millis(parse_nonzero(
                get(AUTHORITY_TIMEOUT_MS_ENV),
                AUTHORITY_TIMEOUT_MS_ENV,
                DEFAULT_RELAY_TIMEOUT.as_millis() as u64,
            )?),
            seed_users: get(SEED_USERS_ENV),
            log_format,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let value = format!("{}:{}", self.host, self.port);
        value
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                name: HOST_ENV,
                value,
            })
    }

    /// Signing key, if any is configured. The Ed25519 file wins over the
    /// HMAC secret.
    pub fn signing_key(&self) -> Result<Option<SigningKey>, ConfigError> {
        if let Some(path) = &self.signing_key_path {
            return Ok(Some(SigningKey::ed25519_pem_file(path)?));
        }
        Ok(self
            .hmac_secret
            .as_deref()
            .map(SigningKey::hmac)
            .transpose()?)
    }

    /// Verification key, if any is configured. The Ed25519 file wins over
    /// the HMAC secret.
    pub fn verification_key(&self) -> Result<Option<VerificationKey>, ConfigError> {
        if let Some(path) = &self.verifying_key_path {
            return Ok(Some(VerificationKey::ed25519_pem_file(path)?));
        }
        Ok(self
            .hmac_secret
            .as_deref()
            .map(VerificationKey::hmac)
            .transpose()?)
    }
}

fn parse_or<T: FromStr>(
    value: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(default),
    }
}

/// Like [`parse_or`], but zero is rejected.
fn parse_nonzero(
    value: Option<String>,
    name: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match parse_or(value.clone(), name, default)? {
        0 => Err(ConfigError::InvalidValue {
            name,
            value: value.unwrap_or_default(),
        }),
        parsed => Ok(parsed),
    }
}
