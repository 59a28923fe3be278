use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Owned by the Conversation State Manager, keyed by `customer_id`
/// rather than `thread_id` so clients may rotate thread ids across
/// turns without losing the active-agent pin (§3 ConversationEntry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub customer_id: String,
    pub agent_name: String,
    pub agent_endpoint: String,
    pub thread_id: String,
    pub last_activity: DateTime<Utc>,
    pub message_count: u64,
}

impl ConversationEntry {
    pub fn is_live(&self, now: DateTime<Utc>, ttl_seconds: i64) -> bool {
        (now - self.last_activity).num_seconds() < ttl_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(last_activity: DateTime<Utc>) -> ConversationEntry {
        ConversationEntry {
            customer_id: "C001".to_string(),
            agent_name: "payment".to_string(),
            agent_endpoint: "http://payment:9000".to_string(),
            thread_id: "thread_C001".to_string(),
            last_activity,
            message_count: 1,
        }
    }

    #[test]
    fn entry_is_live_within_ttl() {
        let entry = entry(Utc::now());
        assert!(entry.is_live(Utc::now(), 300));
    }

    #[test]
    fn entry_expires_past_ttl() {
        let entry = entry(Utc::now() - chrono::Duration::seconds(301));
        assert!(!entry.is_live(Utc::now(), 300));
    }
}
