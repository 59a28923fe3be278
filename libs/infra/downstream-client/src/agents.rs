use std::time::Duration;

use orchestrator_models::Message;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::errors::DownstreamError;

/// Hard deadline on an agent invocation (§5: "Agent dispatch: 300 s").
/// No retries on expiry — the dispatcher surfaces a distinct error kind.
const AGENT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(300);

/// Fixed configuration table of sentinel strings an agent response may
/// contain to signal a committed write (§4.6, §6.3).
const WRITE_SENTINELS: &[&str] = &["TRANSFER COMPLETED", "TICKET CREATED"];

#[derive(Debug, Serialize)]
struct InvokeRequest<'a> {
    messages: &'a [Message],
    thread_id: &'a str,
    customer_id: &'a str,
    user_email: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct InvokeResponseBody {
    response: String,
    thread_id: Option<String>,
}

/// The agent's reply, plus whether it carried a write sentinel so the
/// caller knows to invalidate the customer's cache.
#[derive(Debug, Clone)]
pub struct AgentInvocationResponse {
    pub response_text: String,
    pub thread_id: String,
    pub triggered_write: bool,
}

/// Invokes specialist agents over their fixed HTTP contract (§6.3).
/// Agents are black-box: the client neither retries nor inspects
/// anything beyond the sentinel table.
#[derive(Clone)]
pub struct AgentClient {
    http: Client,
}

impl AgentClient {
    pub fn new() -> Self {
        Self {
            http: Client::builder()
                .timeout(AGENT_DISPATCH_TIMEOUT)
                .build()
                .expect("reqwest client configuration is valid"),
        }
    }

    #[instrument(skip(self, messages), fields(agent_endpoint = %agent_endpoint, customer_id = %customer_id))]
    pub async fn invoke(
        &self,
        agent_endpoint: &str,
        messages: &[Message],
        thread_id: &str,
        customer_id: &str,
        user_email: &str,
    ) -> Result<AgentInvocationResponse, DownstreamError> {
        let url = format!("{}/invoke", agent_endpoint.trim_end_matches('/'));
        let body = InvokeRequest { messages, thread_id, customer_id, user_email, stream: false };

        let response = self.http.post(&url).json(&body).send().await.map_err(|err| {
            if err.is_timeout() {
                DownstreamError::Timeout(url.clone())
            } else {
                DownstreamError::Unreachable(url.clone(), err.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(DownstreamError::Unreachable(url, format!("status {}", response.status())));
        }

        let body: InvokeResponseBody = response
            .json()
            .await
            .map_err(|err| DownstreamError::MalformedResponse(url, err.to_string()))?;

        let triggered_write = contains_write_sentinel(&body.response);

        Ok(AgentInvocationResponse {
            triggered_write,
            thread_id: body.thread_id.unwrap_or_else(|| thread_id.to_string()),
            response_text: body.response,
        })
    }
}

impl Default for AgentClient {
    fn default() -> Self {
        Self::new()
    }
}

fn contains_write_sentinel(response_text: &str) -> bool {
    WRITE_SENTINELS.iter().any(|sentinel| response_text.contains(sentinel))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_known_sentinels() {
        assert!(contains_write_sentinel("TRANSFER COMPLETED; transaction_id=TXN-001"));
        assert!(contains_write_sentinel("All done.\nTICKET CREATED #4521"));
    }

    #[test]
    fn ignores_unrelated_text() {
        assert!(!contains_write_sentinel("Your balance is 113,400.00 THB"));
    }
}
