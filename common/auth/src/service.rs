use std::fmt;
use std::sync::Arc;

use common_observability::AuthMetrics;
use tracing::info;

use crate::claims::{AuthenticatedPrincipal, ClaimSet, Identity};
use crate::config::TokenConfiguration;
use crate::error::{AuthResult, Rejected};
use crate::gate::{AuthorizationGate, Policy};
use crate::issuer::{IssuedToken, TokenIssuer};
use crate::signing::{SigningKey, SigningMaterial};
use crate::validator::TokenValidator;

/// Process-wide token services, built once at startup and shared read-only.
#[derive(Clone)]
pub struct JwtAuth {
    material: SigningMaterial,
    issuer: Arc<TokenIssuer>,
    gate: Arc<AuthorizationGate>,
    metrics: Option<AuthMetrics>,
}

impl JwtAuth {
    pub fn new(config: TokenConfiguration, material: SigningMaterial) -> AuthResult<Self> {
        config.ensure_valid()?;
        let issuer = Arc::new(TokenIssuer::new(config.clone(), material.clone()));
        let validator = Arc::new(TokenValidator::new(config.clone(), material.clone()));
        let gate = Arc::new(AuthorizationGate::new(validator));
        info!(
            issuer = %config.issuer,
            audience = %config.audience,
            expiration_seconds = config.expiration_seconds,
            clock_skew_seconds = config.clock_skew_seconds,
            "token services ready"
        );
        Ok(Self {
            material,
            issuer,
            gate,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: AuthMetrics) -> Self {
        self.gate = Arc::new(self.gate.as_ref().clone().with_metrics(metrics.clone()));
        self.metrics = Some(metrics);
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn Policy>) -> Self {
        self.gate = Arc::new(self.gate.as_ref().clone().with_policy(policy));
        self
    }

    /// Login hand-off: mints a token for an identity whose credentials were already checked.
    ///
    /// `extra` claims are merged over the identity defaults; the subject always
    /// comes from the identity.
    pub fn issue_token_for(&self, identity: &Identity, extra: ClaimSet) -> AuthResult<IssuedToken> {
        let mut claims = identity.claims();
        claims.extend(extra);
        let issued = self.issuer.issue(&claims)?;
        if let Some(metrics) = &self.metrics {
            metrics.token_issued();
        }
        Ok(issued)
    }

    /// Request hand-off: the raw `Authorization` header value, if any.
    pub fn validate_request(&self, authorization: Option<&str>) -> Result<AuthenticatedPrincipal, Rejected> {
        self.gate.authorize(authorization)
    }

    pub fn issuer(&self) -> Arc<TokenIssuer> {
        self.issuer.clone()
    }

    pub fn gate(&self) -> Arc<AuthorizationGate> {
        self.gate.clone()
    }

    pub fn signing_key(&self) -> &SigningKey {
        self.material.signing_key()
    }
}

impl fmt::Debug for JwtAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtAuth")
            .field("config", self.issuer.config())
            .field("signing_key", self.material.signing_key())
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use crate::signing::KeySource;
    use serde_json::json;

    fn material() -> SigningMaterial {
        SigningMaterial::load(&KeySource::Secret("service-test-secret-0123456789abcdef".into())).expect("secret loads")
    }

    #[test]
    fn invalid_configuration_fails_at_startup() {
        let err = JwtAuth::new(TokenConfiguration::new("app", "", 3600), material()).expect_err("no audience");
        assert!(matches!(err, AuthError::InvalidConfiguration(_)));
    }

    #[test]
    fn issued_token_passes_the_gate() {
        let auth = JwtAuth::new(TokenConfiguration::new("app", "app-clients", 3600), material()).unwrap();
        let identity = Identity::new("u1", "u1@example.com").with_name("User One");
        let extra = ClaimSet::new("ignored").with_claim("role", "admin").unwrap();

        let issued = auth.issue_token_for(&identity, extra).expect("issue");
        let header = format!("Bearer {}", issued.access_token);
        let principal = auth.validate_request(Some(&header)).expect("authorized");

        assert_eq!(principal.subject(), "u1");
        assert_eq!(principal.claim("role"), Some(&json!("admin")));
        assert_eq!(principal.claim("unique_name"), Some(&json!("u1@example.com")));
        assert_eq!(principal.claim("name"), Some(&json!("User One")));
    }

    #[test]
    fn metrics_count_issuance_and_decisions() {
        let metrics = AuthMetrics::new().unwrap();
        let auth = JwtAuth::new(TokenConfiguration::new("app", "app-clients", 3600), material())
            .unwrap()
            .with_metrics(metrics.clone());

        let issued = auth.issue_token_for(&Identity::new("u1", "u1@example.com"), ClaimSet::new("u1")).unwrap();
        let header = format!("Bearer {}", issued.access_token);
        assert!(auth.validate_request(Some(&header)).is_ok());
        assert!(auth.validate_request(None).is_err());

        assert_eq!(metrics.tokens_issued.get(), 1);
        assert_eq!(metrics.gate_decisions.with_label_values(&["authorized"]).get(), 1);
        assert_eq!(metrics.gate_decisions.with_label_values(&["rejected"]).get(), 1);
    }
}
