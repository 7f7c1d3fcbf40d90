use crate::error::{AuthError, AuthResult};

/// Upper bound for token lifetimes and clock skew: ten years.
pub const MAX_LIFETIME_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

/// Issuer, audience and lifetime rules shared by token issuance and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenConfiguration {
    /// Value written to and expected in the `iss` claim.
    pub issuer: String,
    /// Value written to and expected in the `aud` claim.
    pub audience: String,
    /// Validity window of issued tokens.
    pub expiration_seconds: i64,
    /// Grace period applied to `exp` during validation. Zero unless overridden.
    pub clock_skew_seconds: i64,
}

impl TokenConfiguration {
    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        expiration_seconds: i64,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            expiration_seconds,
            clock_skew_seconds: 0,
        }
    }

    /// Adjust the allowed clock skew.
    pub fn with_clock_skew(mut self, seconds: i64) -> Self {
        self.clock_skew_seconds = seconds;
        self
    }

    pub fn ensure_valid(&self) -> AuthResult<()> {
        if self.issuer.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration("issuer must not be empty".into()));
        }
        if self.audience.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration("audience must not be empty".into()));
        }
        if self.expiration_seconds <= 0 {
            return Err(AuthError::InvalidConfiguration(format!(
                "expiration_seconds must be positive, got {}",
                self.expiration_seconds
            )));
        }
        if self.expiration_seconds > MAX_LIFETIME_SECONDS {
            return Err(AuthError::InvalidConfiguration(format!(
                "expiration_seconds must be at most {MAX_LIFETIME_SECONDS}, got {}",
                self.expiration_seconds
            )));
        }
        if self.clock_skew_seconds < 0 {
            return Err(AuthError::InvalidConfiguration(format!(
                "clock_skew_seconds must not be negative, got {}",
                self.clock_skew_seconds
            )));
        }
        if self.clock_skew_seconds > MAX_LIFETIME_SECONDS {
            return Err(AuthError::InvalidConfiguration(format!(
                "clock_skew_seconds must be at most {MAX_LIFETIME_SECONDS}, got {}",
                self.clock_skew_seconds
            )));
        }
        Ok(())
    }
}
