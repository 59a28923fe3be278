use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    RoutingDecision,
    CacheHit,
    CacheMiss,
    CachePopulateOk,
    CachePopulateFail,
    DispatchOk,
    DispatchFail,
    ContinuationBypass,
    Invalidate,
    /// A `thinking` event dropped under backpressure (§4.7).
    StreamDrop,
}

/// Append-only audit line (§3 AuditRecord, §6.2 `<root>/audit/orchestrator-YYYY-MM-DD.ndjson`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub customer_id: String,
    pub thread_id: String,
    pub event_type: EventType,
    pub details: Value,
}

impl AuditRecord {
    pub fn new(
        customer_id: impl Into<String>,
        thread_id: impl Into<String>,
        event_type: EventType,
        details: Value,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            customer_id: customer_id.into(),
            thread_id: thread_id.into(),
            event_type,
            details,
        }
    }
}
