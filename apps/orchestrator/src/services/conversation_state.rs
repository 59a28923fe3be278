use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use orchestrator_models::ConversationEntry;
use tokio::sync::Mutex;
use tracing::instrument;

const CONVERSATION_TTL_SECONDS: i64 = 300;

/// In-memory `customer_id -> ConversationEntry` map (C4, §4.3). State
/// is process-local and lost on restart; that is an accepted
/// degradation, not a bug (§4.3 "degrades gracefully").
#[derive(Clone)]
pub struct ConversationStateManager {
    entries: Arc<Mutex<HashMap<String, ConversationEntry>>>,
}

impl ConversationStateManager {
    pub fn new() -> Self {
        Self { entries: Arc::new(Mutex::new(HashMap::new())) }
    }

    #[instrument(skip(self))]
    pub async fn update(&self, customer_id: &str, agent_name: &str, agent_endpoint: &str, thread_id: &str) {
        let mut entries = self.entries.lock().await;
        let message_count = entries.get(customer_id).map(|entry| entry.message_count).unwrap_or(0);
        entries.insert(
            customer_id.to_string(),
            ConversationEntry {
                customer_id: customer_id.to_string(),
                agent_name: agent_name.to_string(),
                agent_endpoint: agent_endpoint.to_string(),
                thread_id: thread_id.to_string(),
                last_activity: Utc::now(),
                message_count: message_count + 1,
            },
        );
    }

    /// Returns the live entry for this customer, evicting it first if
    /// its sliding TTL has elapsed (§4.3 `active`).
    #[instrument(skip(self))]
    pub async fn active(&self, customer_id: &str) -> Option<ConversationEntry> {
        let mut entries = self.entries.lock().await;
        let is_live = entries
            .get(customer_id)
            .map(|entry| entry.is_live(Utc::now(), CONVERSATION_TTL_SECONDS))
            .unwrap_or(false);

        if is_live {
            entries.get(customer_id).cloned()
        } else {
            entries.remove(customer_id);
            None
        }
    }

    pub async fn clear(&self, customer_id: &str) {
        self.entries.lock().await.remove(customer_id);
    }

    /// Evicts every entry past its sliding TTL. Called by the
    /// conversation reaper daemon (§4.10).
    pub async fn evict_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now, CONVERSATION_TTL_SECONDS));
        before - entries.len()
    }
}

impl Default for ConversationStateManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_then_active_returns_the_written_entry() {
        let manager = ConversationStateManager::new();
        manager.update("C001", "payment", "http://payment:9000", "thread_1").await;

        let entry = manager.active("C001").await.expect("just written");
        assert_eq!(entry.agent_name, "payment");
        assert_eq!(entry.thread_id, "thread_1");
        assert_eq!(entry.message_count, 1);
    }

    #[tokio::test]
    async fn repeated_updates_increment_message_count_and_preserve_latest_agent() {
        let manager = ConversationStateManager::new();
        manager.update("C001", "account", "http://account:9001", "thread_1").await;
        manager.update("C001", "payment", "http://payment:9000", "thread_1").await;

        let entry = manager.active("C001").await.expect("present");
        assert_eq!(entry.agent_name, "payment");
        assert_eq!(entry.message_count, 2);
    }

    #[tokio::test]
    async fn active_returns_none_and_evicts_once_ttl_has_elapsed() {
        let manager = ConversationStateManager::new();
        manager.update("C001", "payment", "http://payment:9000", "thread_1").await;

        {
            let mut entries = manager.entries.lock().await;
            let entry = entries.get_mut("C001").unwrap();
            entry.last_activity = Utc::now() - chrono::Duration::seconds(301);
        }

        assert!(manager.active("C001").await.is_none());
        assert!(manager.active("C001").await.is_none(), "entry must have been evicted, not just hidden");
    }

    #[tokio::test]
    async fn clear_removes_the_entry_unconditionally() {
        let manager = ConversationStateManager::new();
        manager.update("C001", "payment", "http://payment:9000", "thread_1").await;
        manager.clear("C001").await;
        assert!(manager.active("C001").await.is_none());
    }

    #[tokio::test]
    async fn evict_expired_sweeps_every_stale_entry_and_reports_the_count() {
        let manager = ConversationStateManager::new();
        manager.update("C001", "payment", "http://payment:9000", "thread_1").await;
        manager.update("C002", "account", "http://account:9001", "thread_2").await;

        {
            let mut entries = manager.entries.lock().await;
            entries.get_mut("C001").unwrap().last_activity = Utc::now() - chrono::Duration::seconds(301);
        }

        assert_eq!(manager.evict_expired().await, 1);
        assert!(manager.active("C002").await.is_some());
    }
}
