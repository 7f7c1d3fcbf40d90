use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts, Request, State};
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;

use crate::claims::AuthenticatedPrincipal;
use crate::error::Rejected;
use crate::gate::{AuthorizationGate, RejectReason};

/// The authenticated principal of the current request.
#[derive(Debug, Clone)]
pub struct AuthContext(pub AuthenticatedPrincipal);

impl AuthContext {
    pub fn principal(&self) -> &AuthenticatedPrincipal {
        &self.0
    }

    pub fn into_principal(self) -> AuthenticatedPrincipal {
        self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    Arc<AuthorizationGate>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Rejected;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<AuthenticatedPrincipal>() {
            return Ok(Self(principal.clone()));
        }

        let gate = Arc::<AuthorizationGate>::from_ref(state);
        authorize_headers(&gate, &parts.headers).map(Self)
    }
}

/// Middleware for `axum::middleware::from_fn_with_state` guarding every route it wraps.
///
/// On success the principal is attached to the request extensions for handlers
/// and the [`AuthContext`] extractor.
pub async fn require_bearer(
    State(gate): State<Arc<AuthorizationGate>>,
    mut request: Request,
    next: Next,
) -> Result<Response, Rejected> {
    let principal = authorize_headers(&gate, request.headers())?;
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

fn authorize_headers(
    gate: &AuthorizationGate,
    headers: &HeaderMap,
) -> Result<AuthenticatedPrincipal, Rejected> {
    match headers.get(AUTHORIZATION) {
        None => gate.authorize(None),
        Some(value) => match value.to_str() {
            Ok(raw) => gate.authorize(Some(raw)),
            Err(_) => Err(gate.reject(RejectReason::MalformedHeader)),
        },
    }
}
