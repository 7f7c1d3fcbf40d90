use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Header};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::claims::{AudienceRepr, ClaimSet, TokenClaims};
use crate::config::TokenConfiguration;
use crate::error::{AuthError, AuthResult};
use crate::signing::SigningMaterial;

/// A freshly signed access token and its lifetime.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub token_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub expires_in: i64,
}

/// Mints signed tokens for identities a login collaborator has already verified.
#[derive(Clone, Debug)]
pub struct TokenIssuer {
    config: TokenConfiguration,
    material: SigningMaterial,
}

impl TokenIssuer {
    pub fn new(config: TokenConfiguration, material: SigningMaterial) -> Self {
        Self { config, material }
    }

    pub fn config(&self) -> &TokenConfiguration {
        &self.config
    }

    pub fn issue(&self, claims: &ClaimSet) -> AuthResult<IssuedToken> {
        self.issue_at(claims, Utc::now())
    }

    /// Issues a token as if the current time were `now`.
    pub fn issue_at(&self, claims: &ClaimSet, now: DateTime<Utc>) -> AuthResult<IssuedToken> {
        let key = self.material.signing_key();
        let issued_at = now.timestamp();
        let expires_at = Duration::try_seconds(self.config.expiration_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                AuthError::Signing(format!(
                    "expiration of {}s overflows the token timestamp",
                    self.config.expiration_seconds
                ))
            })?;
        let token_id = Uuid::new_v4().to_string();

        let payload = TokenClaims {
            iss: self.config.issuer.clone(),
            aud: AudienceRepr::Single(self.config.audience.clone()),
            exp: expires_at.timestamp(),
            iat: Some(issued_at),
            nbf: Some(issued_at),
            jti: Some(token_id.clone()),
            claims: claims.iter().map(|(name, value)| (name.clone(), value.clone())).collect(),
        };

        let mut header = Header::new(key.algorithm());
        header.kid = Some(key.kid().to_string());

        let access_token = encode(&header, &payload, key.encoding_key())
            .map_err(|err| AuthError::Signing(err.to_string()))?;

        debug!(sub = claims.subject(), jti = %token_id, exp = payload.exp, "issued access token");

        Ok(IssuedToken {
            access_token,
            token_type: "Bearer",
            token_id,
            issued_at: now,
            expires_at,
            expires_in: self.config.expiration_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::KeySource;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn issuer() -> TokenIssuer {
        let material = SigningMaterial::load(&KeySource::Secret("issuer-test-secret-0123456789abcdef".into()))
            .expect("secret loads");
        TokenIssuer::new(TokenConfiguration::new("app", "app-clients", 3600), material)
    }

    fn payload_of(token: &str) -> Value {
        let segment = token.split('.').nth(1).expect("payload segment");
        let bytes = URL_SAFE_NO_PAD.decode(segment).expect("base64 payload");
        serde_json::from_slice(&bytes).expect("json payload")
    }

    #[test]
    fn payload_carries_registered_and_application_claims() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let claims = ClaimSet::new("u1").with_claim("role", "admin").unwrap();
        let issued = issuer().issue_at(&claims, now).expect("issue");

        let payload = payload_of(&issued.access_token);
        assert_eq!(payload["iss"], json!("app"));
        assert_eq!(payload["aud"], json!("app-clients"));
        assert_eq!(payload["sub"], json!("u1"));
        assert_eq!(payload["role"], json!("admin"));
        assert_eq!(payload["iat"], json!(now.timestamp()));
        assert_eq!(payload["exp"], json!(now.timestamp() + 3600));
        assert_eq!(payload["jti"], json!(issued.token_id));
    }

    #[test]
    fn lifetime_follows_configuration() {
        let now = Utc::now();
        let issued = issuer().issue_at(&ClaimSet::new("u1"), now).expect("issue");
        assert_eq!(issued.token_type, "Bearer");
        assert_eq!(issued.expires_in, 3600);
        assert_eq!(issued.expires_at - issued.issued_at, Duration::seconds(3600));
    }

    #[test]
    fn header_names_key_id() {
        let issued = issuer().issue(&ClaimSet::new("u1")).expect("issue");
        let header = jsonwebtoken::decode_header(&issued.access_token).expect("header");
        assert_eq!(header.kid.as_deref(), Some("local-secret"));
        assert_eq!(header.alg, jsonwebtoken::Algorithm::HS256);
    }

    #[test]
    fn token_ids_are_unique() {
        let issuer = issuer();
        let first = issuer.issue(&ClaimSet::new("u1")).expect("issue");
        let second = issuer.issue(&ClaimSet::new("u1")).expect("issue");
        assert_ne!(first.token_id, second.token_id);
        assert_ne!(first.access_token, second.access_token);
    }

    #[test]
    fn overflowing_lifetime_is_an_error() {
        let material = SigningMaterial::load(&KeySource::Secret("issuer-test-secret-0123456789abcdef".into()))
            .expect("secret loads");
        let issuer = TokenIssuer::new(
            TokenConfiguration::new("app", "app-clients", 10_000_000_000_000),
            material,
        );
        let err = issuer.issue(&ClaimSet::new("u1")).expect_err("overflow");
        assert!(matches!(err, AuthError::Signing(_)));
    }
}
