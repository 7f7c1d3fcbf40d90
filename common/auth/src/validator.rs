use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, decode_header, Validation};
use tracing::debug;

use crate::claims::{AuthenticatedPrincipal, ClaimSet, TokenClaims};
use crate::config::TokenConfiguration;
use crate::error::ValidationError;
use crate::signing::SigningMaterial;

/// Seam between the authorization gate and whatever checks a bearer token.
pub trait TokenValidation: Send + Sync {
    fn validate(&self, token: &str) -> Result<AuthenticatedPrincipal, ValidationError>;
}

/// Stateless verifier for tokens minted by [`crate::TokenIssuer`].
#[derive(Clone, Debug)]
pub struct TokenValidator {
    config: TokenConfiguration,
    material: SigningMaterial,
}

impl TokenValidator {
    pub fn new(config: TokenConfiguration, material: SigningMaterial) -> Self {
        Self { config, material }
    }

    /// Validates `token` as if the current time were `now`.
    ///
    /// Checks run in a fixed order and the first failure wins: structure,
    /// signature, issuer, audience, expiry.
    pub fn validate_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedPrincipal, ValidationError> {
        let key = self.material.signing_key();

        let header = decode_header(token).map_err(|_| ValidationError::MalformedToken)?;
        if header.alg != key.algorithm() {
            return Err(ValidationError::InvalidSignature);
        }
        if let Some(kid) = header.kid.as_deref() {
            if kid != key.kid() {
                return Err(ValidationError::InvalidSignature);
            }
        }

        // Registered claims are checked below so the order of failures stays fixed.
        let mut validation = Validation::new(key.algorithm());
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let token_data = decode::<TokenClaims>(token, key.decoding_key(), &validation)?;
        let payload = token_data.claims;
        let claims = ClaimSet::from_verified(payload.claims).ok_or(ValidationError::MalformedToken)?;

        if payload.iss != self.config.issuer {
            return Err(ValidationError::IssuerMismatch);
        }
        if !payload.aud.contains(&self.config.audience) {
            return Err(ValidationError::AudienceMismatch);
        }
        if now.timestamp() > payload.exp.saturating_add(self.config.clock_skew_seconds) {
            return Err(ValidationError::Expired);
        }

        let expires_at = Utc
            .timestamp_opt(payload.exp, 0)
            .single()
            .ok_or(ValidationError::MalformedToken)?;
        let issued_at = payload
            .iat
            .and_then(|iat| Utc.timestamp_opt(iat, 0).single());

        debug!(sub = claims.subject(), jti = ?payload.jti, "validated access token");

        Ok(AuthenticatedPrincipal {
            claims,
            authenticated: true,
            token_id: payload.jti,
            issued_at,
            expires_at,
        })
    }
}

impl TokenValidation for TokenValidator {
    fn validate(&self, token: &str) -> Result<AuthenticatedPrincipal, ValidationError> {
        self.validate_at(token, Utc::now())
    }
}
