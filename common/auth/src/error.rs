use axum::response::{IntoResponse, Response};
use common_http_errors::ApiError;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Failures raised while wiring the token core or minting tokens.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("signing material unavailable: {0}")]
    SigningMaterialUnavailable(String),
    #[error("invalid token configuration: {0}")]
    InvalidConfiguration(String),
    #[error("claim '{0}' is managed by the token issuer")]
    ReservedClaim(String),
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Why a presented token was not accepted. Checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("token could not be parsed")]
    MalformedToken,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token issuer does not match")]
    IssuerMismatch,
    #[error("token audience does not match")]
    AudienceMismatch,
    #[error("token has expired")]
    Expired,
}

impl ValidationError {
    /// Stable label used in logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::MalformedToken => "malformed_token",
            ValidationError::InvalidSignature => "invalid_signature",
            ValidationError::IssuerMismatch => "issuer_mismatch",
            ValidationError::AudienceMismatch => "audience_mismatch",
            ValidationError::Expired => "expired",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for ValidationError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match value.kind() {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::Crypto(_) => ValidationError::InvalidSignature,
            _ => ValidationError::MalformedToken,
        }
    }
}

/// Opaque outcome of a denied request. Carries no detail about which check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("request rejected")]
pub struct Rejected;

impl IntoResponse for Rejected {
    fn into_response(self) -> Response {
        ApiError::unauthorized().into_response()
    }
}
