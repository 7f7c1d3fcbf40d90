use common_http_errors::ApiError;

use crate::claims::AuthenticatedPrincipal;

/// Fails with `ForbiddenMissingRole` unless the principal holds one of `allowed`.
pub fn ensure_role(principal: &AuthenticatedPrincipal, allowed: &[&str]) -> Result<(), ApiError> {
    if allowed.is_empty() {
        return Ok(());
    }

    if allowed.iter().any(|role| principal.has_role(role)) {
        Ok(())
    } else {
        Err(ApiError::ForbiddenMissingRole {
            role: allowed.join(", "),
        })
    }
}
