use std::sync::Arc;

use orchestrator_downstream::{AgentClient, DownstreamError};
use orchestrator_models::{Message, OrchestratorError};
use tracing::instrument;

use crate::services::audit_log::AuditLog;
use crate::services::cache_store::CacheStore;
use crate::services::supervisor_router::EscalationPinStore;

/// The dispatcher's answer to one invocation, already stripped of
/// transport concerns (C6, §4.6).
#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub response_text: String,
    pub thread_id: String,
}

/// Sends a normalized invocation to the selected agent and returns its
/// text response. On a detected write sentinel, invalidates the
/// customer's cache before returning (§4.6, I5).
pub struct AgentDispatcher {
    client: AgentClient,
    cache: Arc<CacheStore>,
    escalation_pins: EscalationPinStore,
    audit: AuditLog,
}

impl AgentDispatcher {
    pub fn new(client: AgentClient, cache: Arc<CacheStore>, escalation_pins: EscalationPinStore, audit: AuditLog) -> Self {
        Self { client, cache, escalation_pins, audit }
    }

    #[instrument(skip(self, messages), fields(agent_endpoint = %agent_endpoint, customer_id = %customer_id))]
    pub async fn dispatch(
        &self,
        agent_endpoint: &str,
        messages: &[Message],
        thread_id: &str,
        customer_id: &str,
        email: &str,
    ) -> Result<AgentResponse, OrchestratorError> {
        let result = self.client.invoke(agent_endpoint, messages, thread_id, customer_id, email).await;

        match result {
            Ok(invocation) => {
                self.escalation_pins.observe_response(customer_id, &invocation.response_text).await;

                if invocation.triggered_write {
                    self.cache.invalidate(customer_id).await;
                    self.audit.record(orchestrator_models::AuditRecord::new(
                        customer_id,
                        thread_id,
                        orchestrator_models::EventType::Invalidate,
                        serde_json::json!({ "reason": "write_sentinel" }),
                    ));
                }

                self.audit.record(orchestrator_models::AuditRecord::new(
                    customer_id,
                    thread_id,
                    orchestrator_models::EventType::DispatchOk,
                    serde_json::json!({ "agent_endpoint": agent_endpoint }),
                ));

                Ok(AgentResponse { response_text: invocation.response_text, thread_id: invocation.thread_id })
            }
            Err(err) => {
                self.audit.record(orchestrator_models::AuditRecord::new(
                    customer_id,
                    thread_id,
                    orchestrator_models::EventType::DispatchFail,
                    serde_json::json!({ "agent_endpoint": agent_endpoint, "reason": err.to_string() }),
                ));

                Err(map_dispatch_error(err))
            }
        }
    }
}

fn map_dispatch_error(err: DownstreamError) -> OrchestratorError {
    match err {
        DownstreamError::Timeout(_) => OrchestratorError::AgentTimeout,
        other => OrchestratorError::AgentUnavailable(other.to_string()),
    }
}
