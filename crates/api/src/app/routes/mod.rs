use axum::{routing::get, Router};

pub mod authz;
pub mod catalog;
pub mod common;
pub mod identities;
pub mod roles;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/portal", get(system::portal))
        .route("/portal/:name", get(system::enter_portal))
        .route("/permissions", get(catalog::list_permissions))
        .route("/authz/explain", get(authz::explain))
        .nest("/roles", roles::router())
        .nest("/identities", identities::router())
}
