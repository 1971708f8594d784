//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: the store and catalog shared by handlers
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};

use peoplehub_infra::{AccessStore, PrincipalResolver};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(jwt_secret: impl AsRef<[u8]>, store: Arc<dyn AccessStore>) -> Router {
    let jwt = Arc::new(peoplehub_auth::Hs256JwtValidator::new(jwt_secret));
    let auth_state = middleware::AuthState {
        jwt,
        resolver: PrincipalResolver::new(store.clone()),
    };

    let services = Arc::new(AppServices::new(store));

    // Protected routes: require a bearer token and a resolved principal.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
}
