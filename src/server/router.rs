use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::admin::admin_router;
use super::submission::submission_router;
use crate::index::{IndexService, IndexVersionHelper};
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub index: Arc<dyn IndexService>,
    pub data_dir: PathBuf,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, index: Arc<dyn IndexService>, data_dir: PathBuf) -> Self {
        Self {
            store,
            index,
            data_dir,
        }
    }

    #[must_use]
    pub fn versions(&self) -> IndexVersionHelper {
        IndexVersionHelper::new(Arc::clone(&self.index))
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/admin", admin_router())
        .nest("/api/v1/submission", submission_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
