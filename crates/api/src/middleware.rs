use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use peoplehub_auth::JwtValidator;
use peoplehub_infra::{AccessStore, PrincipalResolver};

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub resolver: PrincipalResolver<dyn AccessStore>,
}

/// Authenticate the bearer token and attach this request's [`Principal`].
///
/// The role is loaded fresh on every request, so role edits apply from the
/// next request on.
///
/// [`Principal`]: peoplehub_auth::Principal
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_bearer(req.headers())?;
    let now = Utc::now();

    let claims = state.jwt.validate(token, now).map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        StatusCode::UNAUTHORIZED
    })?;

    let principal = state.resolver.resolve(claims.sub, now).await.map_err(|e| {
        tracing::error!(identity_id = %claims.sub, error = %e, "principal resolution failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}
