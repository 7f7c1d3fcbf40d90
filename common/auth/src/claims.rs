use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AuthError, AuthResult};

pub const SUBJECT_CLAIM: &str = "sub";

/// Claims the issuer writes itself; callers may not set them.
pub const REGISTERED_CLAIMS: &[&str] = &["iss", "aud", "exp", "iat", "nbf", "jti", SUBJECT_CLAIM];

/// Application claims embedded in a token. Always carries a string `sub`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClaimSet(BTreeMap<String, Value>);

impl ClaimSet {
    pub fn new(subject: impl Into<String>) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(SUBJECT_CLAIM.to_string(), Value::String(subject.into()));
        Self(entries)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> AuthResult<()> {
        let name = name.into();
        if REGISTERED_CLAIMS.contains(&name.as_str()) {
            return Err(AuthError::ReservedClaim(name));
        }
        self.0.insert(name, value.into());
        Ok(())
    }

    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> AuthResult<Self> {
        self.insert(name, value)?;
        Ok(self)
    }

    /// Copies every non-subject claim of `other` into this set.
    pub fn extend(&mut self, other: ClaimSet) {
        for (name, value) in other.0 {
            if name != SUBJECT_CLAIM {
                self.0.insert(name, value);
            }
        }
    }

    pub fn subject(&self) -> &str {
        self.0
            .get(SUBJECT_CLAIM)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rebuilds a claim set from a verified payload remainder; `None` without a string `sub`.
    pub(crate) fn from_verified(entries: BTreeMap<String, Value>) -> Option<Self> {
        match entries.get(SUBJECT_CLAIM) {
            Some(Value::String(_)) => Some(Self(entries)),
            _ => None,
        }
    }
}

/// A principal whose credentials were confirmed by a login collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Default claims for this identity: `sub`, `unique_name` and optionally `name`.
    pub fn claims(&self) -> ClaimSet {
        let mut entries = ClaimSet::new(self.id.clone());
        entries
            .0
            .insert("unique_name".to_string(), Value::String(self.email.clone()));
        if let Some(name) = &self.name {
            entries.0.insert("name".to_string(), Value::String(name.clone()));
        }
        entries
    }
}

/// Result of a successful validation, scoped to one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedPrincipal {
    pub claims: ClaimSet,
    pub authenticated: bool,
    pub token_id: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

impl AuthenticatedPrincipal {
    pub fn subject(&self) -> &str {
        self.claims.subject()
    }

    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// Checks `role` and `roles` claims, each either a string or an array of strings.
    pub fn has_role(&self, role: &str) -> bool {
        ["role", "roles"].iter().any(|name| match self.claims.get(name) {
            Some(Value::String(value)) => value == role,
            Some(Value::Array(values)) => values.iter().any(|value| value.as_str() == Some(role)),
            _ => false,
        })
    }
}

/// Wire payload of an access token.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct TokenClaims {
    pub iss: String,
    pub aud: AudienceRepr,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(flatten)]
    pub claims: BTreeMap<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum AudienceRepr {
    Single(String),
    Many(Vec<String>),
}

impl AudienceRepr {
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            AudienceRepr::Single(item) => item == audience,
            AudienceRepr::Many(items) => items.iter().any(|item| item == audience),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registered_claims_are_refused() {
        for name in REGISTERED_CLAIMS {
            let err = ClaimSet::new("u1").with_claim(*name, "x").expect_err("reserved");
            assert!(matches!(err, AuthError::ReservedClaim(actual) if actual == *name));
        }
    }

    #[test]
    fn identity_claims_carry_subject_and_unique_name() {
        let identity = Identity::new("42", "ada@example.com").with_name("Ada");
        let claims = identity.claims();
        assert_eq!(claims.subject(), "42");
        assert_eq!(claims.get("unique_name"), Some(&json!("ada@example.com")));
        assert_eq!(claims.get("name"), Some(&json!("Ada")));
    }

    #[test]
    fn extend_keeps_own_subject() {
        let mut claims = ClaimSet::new("u1");
        let other = ClaimSet::new("intruder").with_claim("role", "admin").unwrap();
        claims.extend(other);
        assert_eq!(claims.subject(), "u1");
        assert_eq!(claims.get("role"), Some(&json!("admin")));
    }

    #[test]
    fn from_verified_requires_string_subject() {
        let mut entries = BTreeMap::new();
        entries.insert("sub".to_string(), json!(7));
        assert!(ClaimSet::from_verified(entries).is_none());
        assert!(ClaimSet::from_verified(BTreeMap::new()).is_none());
    }

    #[test]
    fn has_role_reads_string_and_array_claims() {
        let principal = |claims: ClaimSet| AuthenticatedPrincipal {
            claims,
            authenticated: true,
            token_id: None,
            issued_at: None,
            expires_at: Utc::now(),
        };

        let single = principal(ClaimSet::new("u1").with_claim("role", "admin").unwrap());
        assert!(single.has_role("admin"));
        assert!(!single.has_role("viewer"));

        let many = principal(ClaimSet::new("u2").with_claim("roles", json!(["viewer", "editor"])).unwrap());
        assert!(many.has_role("editor"));
        assert!(!many.has_role("admin"));
    }

    #[test]
    fn audience_matches_single_or_list() {
        assert!(AudienceRepr::Single("a".into()).contains("a"));
        assert!(AudienceRepr::Many(vec!["b".into(), "a".into()]).contains("a"));
        assert!(!AudienceRepr::Many(vec![]).contains("a"));
    }
}
