use axum::extract::State;
use axum::{Extension, Json};
use orchestrator_models::Principal;
use serde_json::{json, Value};
use tracing::instrument;

use crate::state::AppState;

/// `POST /cache/initialize` (§6.1). Explicit warmup trigger; returns
/// whether a bundle was already valid, one is in flight, or a new
/// populate was just scheduled.
#[instrument(skip(state), fields(customer_id = %principal.customer_id))]
pub async fn initialize_cache(State(state): State<AppState>, Extension(principal): Extension<Principal>) -> Json<Value> {
    let customer_id = principal.customer_id.clone();
    let status = state.cache.ensure_populated(&customer_id, principal).await;
    Json(json!({ "status": status.as_str() }))
}
