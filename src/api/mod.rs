use axum::{Router, http::HeaderValue, middleware};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

mod admin;
pub mod auth;
pub mod error;
pub mod events;
mod requests;
pub mod types;
mod webhooks;

pub use error::ApiError;

use crate::state::SharedState;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,
    pub auth_cache: Arc<auth::AuthCache>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(shared: Arc<SharedState>) -> Arc<Self> {
        Arc::new(Self {
            shared,
            auth_cache: Arc::new(auth::AuthCache::default()),
            start_time: std::time::Instant::now(),
        })
    }
}

pub async fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.shared.config.read().await.server.cors_allowed_origins.clone();

    let admin_routes = admin::router().route_layer(middleware::from_fn_with_state(state.clone(), auth::auth_middleware));

    let api_router = Router::new()
        .merge(requests::router())
        .merge(events::router())
        .merge(admin_routes)
        .with_state(state.clone());

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .merge(webhooks::router().with_state(state))
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
