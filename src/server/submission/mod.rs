mod handlers;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::server::AppState;

/// Routes scoped to one `/{program}/{project}` pair.
pub fn submission_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/{program}/{project}/access", get(handlers::get_access))
        .route(
            "/{program}/{project}/files/{node_id}",
            get(handlers::get_file),
        )
        .route(
            "/{program}/{project}/files/{node_id}/versions",
            get(handlers::list_file_versions).post(handlers::add_file_version),
        )
        .route(
            "/{program}/{project}/files/{node_id}/release",
            post(handlers::release_file),
        )
}
