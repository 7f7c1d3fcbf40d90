use api_auth::{AuthContext, ClaimSet, JwkKey};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, SecondsFormat, Utc};
use common_http_errors::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::AppState;

pub async fn health() -> &'static str {
    "ok"
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub authenticated: bool,
    pub created: String,
    pub expiration: String,
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub message: &'static str,
}

fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub async fn login_user(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "login rejected: unreadable body");
        ApiError::bad_request("invalid_login_request")
    })?;
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::BadRequest {
            code: "invalid_login_request",
            message: Some("email and password are required".into()),
        });
    }

    let identity = state
        .users
        .authenticate(&request.email, &request.password)
        .await
        .map_err(|err| {
            error!(?err, "credential lookup failed");
            ApiError::internal("credential lookup failed")
        })?;

    let Some(identity) = identity else {
        warn!("login rejected: invalid credentials");
        return Err(ApiError::Unauthorized {
            code: "invalid_credentials",
        });
    };

    let issued = state
        .auth
        .issue_token_for(&identity, ClaimSet::new(identity.id.clone()))
        .map_err(|err| {
            error!(%err, "token issuance failed");
            ApiError::internal("token issuance failed")
        })?;

    info!(sub = %identity.id, jti = %issued.token_id, "login succeeded");

    Ok(Json(LoginResponse {
        authenticated: true,
        created: format_timestamp(issued.issued_at),
        expiration: format_timestamp(issued.expires_at),
        access_token: issued.access_token,
        token_type: issued.token_type,
        expires_in: issued.expires_in,
        user_name: identity.email,
        name: identity.name,
        message: "OK",
    }))
}

#[derive(Debug, Serialize)]
pub struct CurrentUser {
    pub subject: String,
    pub claims: Value,
    pub expires_at: String,
}

pub async fn current_user(AuthContext(principal): AuthContext) -> ApiResult<Json<CurrentUser>> {
    let claims = serde_json::to_value(&principal.claims).map_err(ApiError::internal)?;
    Ok(Json(CurrentUser {
        subject: principal.subject().to_string(),
        claims,
        expires_at: format_timestamp(principal.expires_at),
    }))
}

#[derive(Serialize)]
pub struct JwksResponse {
    pub keys: Vec<JwkKey>,
}

pub async fn jwks(State(state): State<AppState>) -> Json<JwksResponse> {
    let keys = state.auth.signing_key().jwk().cloned().into_iter().collect();
    Json(JwksResponse { keys })
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            )],
            body,
        )
            .into_response(),
        Err(err) => ApiError::internal(err).into_response(),
    }
}
