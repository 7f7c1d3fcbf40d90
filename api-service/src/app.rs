use std::sync::Arc;

use api_auth::{require_bearer, AuthorizationGate, JwtAuth};
use axum::extract::FromRef;
use axum::routing::{get, post};
use axum::Router;
use common_observability::AuthMetrics;

use crate::handlers::{current_user, health, jwks, login_user, metrics};
use crate::users::UserDirectory;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth: JwtAuth,
    pub users: Arc<dyn UserDirectory>,
    pub metrics: AuthMetrics,
}

impl FromRef<AppState> for Arc<AuthorizationGate> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.gate()
    }
}

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/users/me", get(current_user))
        .route_layer(axum::middleware::from_fn_with_state(
            state.auth.gate(),
            require_bearer,
        ));

    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics))
        .route("/.well-known/jwks.json", get(jwks))
        .route("/login", post(login_user))
        .merge(protected)
        .with_state(state)
}
