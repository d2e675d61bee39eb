use axum::{Router, http::HeaderValue, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

mod error;
mod health;
mod manifest;
mod meta;
mod stream;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,
}

pub fn router(shared: Arc<SharedState>) -> Router {
    let cors_origins = shared.config.server.cors_allowed_origins.clone();
    let state = AppState { shared };

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = cors_origins
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .route("/health", get(health::get_health))
        .route("/manifest.json", get(manifest::get_manifest))
        .route("/stream/{id}", get(stream::stream_episode))
        .route("/meta/{id}", get(meta::get_meta))
        .with_state(state)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
