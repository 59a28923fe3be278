use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use orchestrator_models::OrchestratorError;

use crate::state::AppState;

/// Resolves the bearer token into a [`Principal`](orchestrator_models::Principal)
/// and inserts it into the request extensions for downstream handlers
/// (§4.1, §6.1 "Authorization: Bearer <token>").
pub async fn auth_guard(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, OrchestratorError> {
    let token = bearer_token(&request)
        .ok_or_else(|| OrchestratorError::Unauthenticated("missing bearer token".to_string()))?;

    let principal = state.principal_resolver.resolve(token).await?;
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}
