use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, Json};

use crate::app::{dto, services::AppServices};

/// GET /permissions - the grouped catalog the role editor renders.
///
/// Open to any authenticated caller; it describes atoms, not grants.
pub async fn list_permissions(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(dto::catalog_to_json(services.catalog))
}
