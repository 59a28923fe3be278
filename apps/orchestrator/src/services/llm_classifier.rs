use std::time::Duration;

use orchestrator_models::AgentCategory;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

const LLM_CLASSIFIER_TIMEOUT: Duration = Duration::from_secs(3);
const CLASSIFIER_PROMPT: &str = "Classify the following banking customer message into exactly \
one category token and output nothing else: account, transaction, payment, product_info, \
money_coach, escalation.";

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    prompt: &'a str,
    message: &'a str,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    label: String,
}

/// Last-resort classifier call (C5 step 4, §4.5). A single bounded
/// call to a small text model; any failure or unrecognized label
/// collapses to the account category rather than propagating.
#[derive(Clone)]
pub struct LlmClassifier {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl LlmClassifier {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                .timeout(LLM_CLASSIFIER_TIMEOUT)
                .build()
                .expect("reqwest client configuration is valid"),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Returns `None` when the endpoint is unconfigured, the call times
    /// out, or the response does not parse to a known category — in
    /// all cases the caller defaults to [`AgentCategory::Account`].
    #[instrument(skip(self, message))]
    pub async fn classify(&self, message: &str) -> Option<AgentCategory> {
        if self.endpoint.is_empty() {
            return None;
        }

        let request = ClassifyRequest { prompt: CLASSIFIER_PROMPT, message, temperature: 0.0, max_tokens: 20 };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| warn!(error = %err, "llm classifier call failed"))
            .ok()?;

        let body: ClassifyResponse = response
            .json()
            .await
            .map_err(|err| warn!(error = %err, "llm classifier returned malformed output"))
            .ok()?;

        match AgentCategory::from_label(&body.label) {
            AgentCategory::Unknown => None,
            category => Some(category),
        }
    }
}
