//! JWT authentication core: signing material, token issuance and validation,
//! and the per-request authorization gate with its axum integration.

pub mod claims;
pub mod config;
pub mod error;
pub mod extractors;
pub mod gate;
pub mod guards;
pub mod issuer;
pub mod service;
pub mod signing;
pub mod validator;

pub use claims::{AuthenticatedPrincipal, ClaimSet, Identity};
pub use config::TokenConfiguration;
pub use error::{AuthError, AuthResult, Rejected, ValidationError};
pub use extractors::{require_bearer, AuthContext};
pub use gate::{AuthorizationGate, Policy, PredicatePolicy, RequireAuthenticatedUser};
pub use guards::ensure_role;
pub use issuer::{IssuedToken, TokenIssuer};
pub use service::JwtAuth;
pub use signing::{JwkKey, KeySource, SigningKey, SigningMaterial};
pub use validator::{TokenValidation, TokenValidator};
