// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing and verification key material.
//!
//! ## Trust model
//!
//! - Only the authority service loads a [`SigningKey`].
//! - Every other service holds at most a [`VerificationKey`]: the shared HMAC
//!   secret, or the authority's Ed25519 public key.
//!
//! Keys are loaded once at startup and never mutated afterwards.

use std::fmt;
use std::path::Path;

use base64ct::{Base64, Encoding};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Validation};

/// Minimum HS256 secret length (256 bits).
pub const MIN_HMAC_SECRET_LEN: usize = 32;

/// Errors raised while loading key material.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("HMAC secret must be at least 32 bytes")]
    WeakSecret,
    #[error("HMAC secret is not valid base64")]
    InvalidBase64,
    #[error("invalid Ed25519 PEM: {0}")]
    InvalidPem(String),
    #[error("failed to read key file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Key used by the authority to mint tokens.
#[derive(Clone)]
pub struct SigningKey {
    encoding: EncodingKey,
    algorithm: Algorithm,
}

impl SigningKey {
    /// HS256 signing key from a raw shared secret.
    pub fn hmac(secret: &[u8]) -> Result<Self, KeyError> {
        check_secret(secret)?;
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
        })
    }

    /// EdDSA signing key from a PKCS#8 `PRIVATE KEY` PEM.
    pub fn ed25519_pem(pem: &[u8]) -> Result<Self, KeyError> {
        let encoding =
            EncodingKey::from_ed_pem(pem).map_err(|e| KeyError::InvalidPem(e.to_string()))?;
        Ok(Self {
            encoding,
            algorithm: Algorithm::EdDSA,
        })
    }

    /// Load an Ed25519 signing key from a PEM file.
    pub fn ed25519_pem_file(path: impl AsRef<Path>) -> Result<Self, KeyError> {
        Self::ed25519_pem(&read_key_file(path.as_ref())?)
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Key used to check token signatures locally.
///
/// Carries the `jsonwebtoken` validation settings alongside the key so they
/// are built once per process rather than once per request.
#[derive(Clone)]
pub struct VerificationKey {
    decoding: DecodingKey,
    validation: Validation,
}

impl VerificationKey {
    /// HS256 verification key from the shared secret.
    pub fn hmac(secret: &[u8]) -> Result<Self, KeyError> {
        check_secret(secret)?;
        Ok(Self::with_algorithm(
            DecodingKey::from_secret(secret),
            Algorithm::HS256,
        ))
    }

    /// EdDSA verification key from a `PUBLIC KEY` PEM.
    pub fn ed25519_pem(pem: &[u8]) -> Result<Self, KeyError> {
        let decoding =
            DecodingKey::from_ed_pem(pem).map_err(|e| KeyError::InvalidPem(e.to_string()))?;
        Ok(Self::with_algorithm(decoding, Algorithm::EdDSA))
    }

    /// Load an Ed25519 public key from a PEM file.
    pub fn ed25519_pem_file(path: impl AsRef<Path>) -> Result<Self, KeyError> {
        Self::ed25519_pem(&read_key_file(path.as_ref())?)
    }

    fn with_algorithm(decoding: DecodingKey, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        // Expiry is compared against the caller's clock by the verifier.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "iat", "exp"]);

        Self {
            decoding,
            validation,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.validation
            .algorithms
            .first()
            .copied()
            .unwrap_or(Algorithm::HS256)
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }

    pub(crate) fn validation(&self) -> &Validation {
        &self.validation
    }
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationKey")
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}

/// Decode a base64 secret as supplied through the environment.
pub fn decode_base64_secret(value: &str) -> Result<Vec<u8>, KeyError> {
    Base64::decode_vec(value.trim()).map_err(|_| KeyError::InvalidBase64)
}

fn check_secret(secret: &[u8]) -> Result<(), KeyError> {
    if secret.len() < MIN_HMAC_SECRET_LEN {
        return Err(KeyError::WeakSecret);
    }
    Ok(())
}

fn read_key_file(path: &Path) -> Result<Vec<u8>, KeyError> {
    std::fs::read(path).map_err(|source| KeyError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const AUTHORITY_PEM: &[u8] = include_bytes!("testdata/authority_ed25519.pem");
    const AUTHORITY_PUB_PEM: &[u8] = include_bytes!("testdata/authority_ed25519.pub.pem");

    #[test]
    fn hmac_rejects_short_secret() {
        assert!(matches!(
            SigningKey::hmac(b"too-short"),
            Err(KeyError::WeakSecret)
        ));
        assert!(matches!(
            VerificationKey::hmac(b""),
            Err(KeyError::WeakSecret)
        ));
    }

    #[test]
    fn hmac_keys_use_hs256() {
        let secret = [7u8; MIN_HMAC_SECRET_LEN];
        assert_eq!(SigningKey::hmac(&secret).unwrap().algorithm(), Algorithm::HS256);
        assert_eq!(
            VerificationKey::hmac(&secret).unwrap().algorithm(),
            Algorithm::HS256
        );
    }

    #[test]
    fn ed25519_pem_fixtures_load() {
        let signing = SigningKey::ed25519_pem(AUTHORITY_PEM).unwrap();
        let verifying = VerificationKey::ed25519_pem(AUTHORITY_PUB_PEM).unwrap();
        assert_eq!(signing.algorithm(), Algorithm::EdDSA);
        assert_eq!(verifying.algorithm(), Algorithm::EdDSA);
    }

    #[test]
    fn garbage_pem_is_rejected() {
        let result = VerificationKey::ed25519_pem(b"-----BEGIN PUBLIC KEY-----\nnope\n");
        assert!(matches!(result, Err(KeyError::InvalidPem(_))));
    }

    #[test]
    fn pem_file_loading_reports_missing_path() {
        let result = SigningKey::ed25519_pem_file("/nonexistent/authority.pem");
        assert!(matches!(result, Err(KeyError::Io { .. })));
    }

    #[test]
    fn pem_file_loading_reads_key() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(AUTHORITY_PUB_PEM).unwrap();
        let key = VerificationKey::ed25519_pem_file(file.path()).unwrap();
        assert_eq!(key.algorithm(), Algorithm::EdDSA);
    }

    #[test]
    fn base64_secret_decoding() {
        assert_eq!(decode_base64_secret(" aGVsbG8= ").unwrap(), b"hello");
        assert!(matches!(
            decode_base64_secret("not base64!"),
            Err(KeyError::InvalidBase64)
        ));
    }

    #[test]
    fn debug_output_hides_key_bytes() {
        let key = SigningKey::hmac(&[42u8; MIN_HMAC_SECRET_LEN]).unwrap();
        let rendered = format!("{key:?}");
        assert!(rendered.contains("HS256"));
        assert!(!rendered.contains("42"));
    }
}
