use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownstreamError {
    #[error("request to {0} timed out")]
    Timeout(String),

    #[error("{0} unreachable: {1}")]
    Unreachable(String, String),

    #[error("{0} returned malformed response: {1}")]
    MalformedResponse(String, String),

    #[error("token verification failed: {0}")]
    TokenInvalid(String),

    #[error("signing key set unreachable and cached set expired")]
    KeySetExpired,
}
