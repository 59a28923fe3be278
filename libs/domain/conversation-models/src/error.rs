use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// The error taxonomy of §7, surfaced to clients as `{ error: { kind, message } }`.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("unknown customer")]
    UnknownCustomer,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("agent timed out")]
    AgentTimeout,

    #[error("agent unavailable: {0}")]
    AgentUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "unauthenticated",
            Self::UnknownCustomer => "unknown_customer",
            Self::BadRequest(_) => "bad_request",
            Self::AgentTimeout => "agent_timeout",
            Self::AgentUnavailable(_) => "agent_unavailable",
            Self::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::UnknownCustomer => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::AgentTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::AgentUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for OrchestratorError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_the_documented_taxonomy() {
        assert_eq!(OrchestratorError::Unauthenticated("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(OrchestratorError::UnknownCustomer.status(), StatusCode::NOT_FOUND);
        assert_eq!(OrchestratorError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(OrchestratorError::AgentTimeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(OrchestratorError::AgentUnavailable("x".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(OrchestratorError::Internal("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn kind_strings_match_the_spec_taxonomy() {
        assert_eq!(OrchestratorError::UnknownCustomer.kind(), "unknown_customer");
        assert_eq!(OrchestratorError::AgentTimeout.kind(), "agent_timeout");
    }
}
