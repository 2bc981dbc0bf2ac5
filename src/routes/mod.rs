use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, http::Method, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod crosstab;
pub mod dataset;

pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_check))
        .merge(dataset::routes())
        .merge(crosstab::routes())
        .layer(DefaultBodyLimit::max(state.config.max_file_size))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> &'static str {
    "OK"
}
