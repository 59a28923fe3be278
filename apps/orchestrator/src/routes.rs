use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{cache, chat, health};
use crate::middleware::auth_guard;
use crate::state::AppState;

/// Builds the service router (§6.1): `/chat` and `/cache/initialize`
/// require a bearer token; `/healthz` does not.
pub fn create_router(state: AppState) -> Router {
    let authenticated = Router::new()
        .route("/chat", post(chat::chat))
        .route("/cache/initialize", post(cache::initialize_cache))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    Router::new()
        .route("/healthz", get(health::healthz))
        .merge(authenticated)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
