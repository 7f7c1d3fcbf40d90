use std::fmt;
use std::sync::Arc;

use common_observability::AuthMetrics;
use tracing::{debug, warn};

use crate::claims::AuthenticatedPrincipal;
use crate::error::{Rejected, ValidationError};
use crate::validator::TokenValidation;

/// A named requirement a principal must satisfy to pass the gate.
pub trait Policy: Send + Sync {
    fn name(&self) -> &str;
    fn evaluate(&self, principal: &AuthenticatedPrincipal) -> bool;
}

/// Admits any principal whose token validated.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireAuthenticatedUser;

impl Policy for RequireAuthenticatedUser {
    fn name(&self) -> &str {
        "Bearer"
    }

    fn evaluate(&self, principal: &AuthenticatedPrincipal) -> bool {
        principal.authenticated
    }
}

/// Policy backed by an arbitrary predicate.
pub struct PredicatePolicy<F> {
    name: String,
    predicate: F,
}

impl<F> PredicatePolicy<F>
where
    F: Fn(&AuthenticatedPrincipal) -> bool + Send + Sync,
{
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl<F> Policy for PredicatePolicy<F>
where
    F: Fn(&AuthenticatedPrincipal) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, principal: &AuthenticatedPrincipal) -> bool {
        principal.authenticated && (self.predicate)(principal)
    }
}

/// Internal reason for a rejection. Logged and counted, never returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RejectReason {
    MissingToken,
    MalformedHeader,
    Invalid(ValidationError),
    PolicyDenied,
}

impl RejectReason {
    fn label(&self) -> &'static str {
        match self {
            RejectReason::MissingToken => "missing_token",
            RejectReason::MalformedHeader => "malformed_header",
            RejectReason::Invalid(err) => err.reason(),
            RejectReason::PolicyDenied => "policy_denied",
        }
    }
}

/// Per-request check that a bearer token is present, valid and satisfies the policy.
#[derive(Clone)]
pub struct AuthorizationGate {
    validator: Arc<dyn TokenValidation>,
    policy: Arc<dyn Policy>,
    metrics: Option<AuthMetrics>,
}

impl AuthorizationGate {
    pub fn new(validator: Arc<dyn TokenValidation>) -> Self {
        Self {
            validator,
            policy: Arc::new(RequireAuthenticatedUser),
            metrics: None,
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn Policy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_metrics(mut self, metrics: AuthMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    /// Decides a request from its raw `Authorization` header value.
    pub fn authorize(&self, authorization: Option<&str>) -> Result<AuthenticatedPrincipal, Rejected> {
        let Some(header) = authorization else {
            return Err(self.reject(RejectReason::MissingToken));
        };
        let Some(token) = parse_bearer(header) else {
            return Err(self.reject(RejectReason::MalformedHeader));
        };

        let principal = self
            .validator
            .validate(token)
            .map_err(|err| self.reject(RejectReason::Invalid(err)))?;

        if !self.policy.evaluate(&principal) {
            return Err(self.reject(RejectReason::PolicyDenied));
        }

        debug!(sub = principal.subject(), policy = self.policy.name(), "request authorized");
        if let Some(metrics) = &self.metrics {
            metrics.authorized();
        }
        Ok(principal)
    }

    pub(crate) fn reject(&self, reason: RejectReason) -> Rejected {
        warn!(reason = reason.label(), policy = self.policy.name(), "request rejected");
        if let Some(metrics) = &self.metrics {
            metrics.rejected(reason.label());
        }
        Rejected
    }
}

impl fmt::Debug for AuthorizationGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationGate")
            .field("policy", &self.policy.name())
            .finish_non_exhaustive()
    }
}

/// Extracts the token from `Bearer <token>`; the scheme is matched case-insensitively.
pub(crate) fn parse_bearer(value: &str) -> Option<&str> {
    let raw = value.trim();
    let (scheme, token) = raw.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
