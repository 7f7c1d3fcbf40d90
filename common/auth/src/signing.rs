use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use rand_core::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{AuthError, AuthResult};

pub const MIN_SECRET_BYTES: usize = 32;
pub const MIN_RSA_BITS: usize = 2048;
pub const DEFAULT_RSA_BITS: usize = 2048;

const SECRET_KEY_ID: &str = "local-secret";

/// Where the process signing key comes from.
#[derive(Clone)]
pub enum KeySource {
    /// Shared secret for HS256.
    Secret(String),
    /// RSA private key in PKCS#8 or PKCS#1 PEM form, used with RS256.
    RsaPem(String),
    /// Fresh RSA key generated from the OS random source.
    GenerateRsa { bits: usize },
}

impl Default for KeySource {
    fn default() -> Self {
        KeySource::GenerateRsa { bits: DEFAULT_RSA_BITS }
    }
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Secret(_) => f.write_str("Secret(..)"),
            KeySource::RsaPem(_) => f.write_str("RsaPem(..)"),
            KeySource::GenerateRsa { bits } => {
                f.debug_struct("GenerateRsa").field("bits", bits).finish()
            }
        }
    }
}

/// Public half of an RSA signing key in JWK form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JwkKey {
    pub kty: &'static str,
    #[serde(rename = "use")]
    pub use_: &'static str,
    pub kid: String,
    pub alg: &'static str,
    pub n: String,
    pub e: String,
}

/// The process signing key. Key bytes never leave this crate.
pub struct SigningKey {
    algorithm: Algorithm,
    kid: String,
    encoding: EncodingKey,
    decoding: DecodingKey,
    jwk: Option<JwkKey>,
}

impl SigningKey {
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Public JWK for asymmetric keys; `None` for shared secrets.
    pub fn jwk(&self) -> Option<&JwkKey> {
        self.jwk.as_ref()
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }

    fn from_secret(secret: &str) -> AuthResult<Self> {
        if secret.len() < MIN_SECRET_BYTES {
            return Err(AuthError::SigningMaterialUnavailable(format!(
                "HMAC secret must be at least {MIN_SECRET_BYTES} bytes"
            )));
        }
        Ok(Self {
            algorithm: Algorithm::HS256,
            kid: SECRET_KEY_ID.to_string(),
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            jwk: None,
        })
    }

    fn from_rsa_pem(pem: &str) -> AuthResult<Self> {
        let private = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|err| {
                AuthError::SigningMaterialUnavailable(format!("failed to parse RSA private key: {err}"))
            })?;
        Self::from_rsa(private)
    }

    fn generate_rsa(bits: usize) -> AuthResult<Self> {
        if bits < MIN_RSA_BITS {
            return Err(AuthError::SigningMaterialUnavailable(format!(
                "RSA keys must be at least {MIN_RSA_BITS} bits, got {bits}"
            )));
        }
        let mut rng = OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits).map_err(|err| {
            AuthError::SigningMaterialUnavailable(format!("RSA key generation failed: {err}"))
        })?;
        Self::from_rsa(private)
    }

    fn from_rsa(private: RsaPrivateKey) -> AuthResult<Self> {
        let bits = private.size() * 8;
        if bits < MIN_RSA_BITS {
            return Err(AuthError::SigningMaterialUnavailable(format!(
                "RSA keys must be at least {MIN_RSA_BITS} bits, got {bits}"
            )));
        }

        let der = private.to_pkcs1_der().map_err(|err| {
            AuthError::SigningMaterialUnavailable(format!("failed to encode RSA private key: {err}"))
        })?;
        let encoding = EncodingKey::from_rsa_der(der.as_bytes());

        let modulus = private.n().to_bytes_be();
        let n = URL_SAFE_NO_PAD.encode(&modulus);
        let e = URL_SAFE_NO_PAD.encode(private.e().to_bytes_be());
        let decoding = DecodingKey::from_rsa_components(&n, &e).map_err(|err| {
            AuthError::SigningMaterialUnavailable(format!("failed to derive RSA public key: {err}"))
        })?;

        let digest = Sha256::digest(&modulus);
        let kid = hex::encode(&digest[..8]);

        let jwk = JwkKey {
            kty: "RSA",
            use_: "sig",
            kid: kid.clone(),
            alg: "RS256",
            n,
            e,
        };

        Ok(Self {
            algorithm: Algorithm::RS256,
            kid,
            encoding,
            decoding,
            jwk: Some(jwk),
        })
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &self.algorithm)
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

/// Owns the signing key for the lifetime of the process.
///
/// Loaded once at startup and shared read-only by the issuer and the
/// validator; cloning only bumps a reference count.
#[derive(Clone, Debug)]
pub struct SigningMaterial {
    key: Arc<SigningKey>,
}

impl SigningMaterial {
    pub fn load(source: &KeySource) -> AuthResult<Self> {
        let key = match source {
            KeySource::Secret(secret) => SigningKey::from_secret(secret)?,
            KeySource::RsaPem(pem) => SigningKey::from_rsa_pem(pem)?,
            KeySource::GenerateRsa { bits } => SigningKey::generate_rsa(*bits)?,
        };
        info!(kid = %key.kid, algorithm = ?key.algorithm, "signing material loaded");
        Ok(Self { key: Arc::new(key) })
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.key
    }
}
