use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::handlers;
use crate::pipeline::ImageRelay;

pub struct AppState {
    pub relay: ImageRelay,
}

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.relay.config().max_upload_bytes;
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/process_image", post(handlers::process_image))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
