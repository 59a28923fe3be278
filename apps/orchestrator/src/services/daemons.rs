use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::services::cache_store::CacheStore;
use crate::services::conversation_state::ConversationStateManager;

const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(600);
const CONVERSATION_REAP_INTERVAL: Duration = Duration::from_secs(60);

/// Runs the cache directory sweep once at boot and then every ten
/// minutes (§4.2 persistence, §4.10).
pub fn spawn_cache_sweep_daemon(cache: Arc<CacheStore>) {
    tokio::spawn(async move {
        cache.sweep_stale_files().await;

        let mut ticker = interval(CACHE_SWEEP_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            cache.sweep_stale_files().await;
        }
    });
}

/// Evicts conversation entries past their sliding TTL every 60
/// seconds, so memory does not grow unbounded between `active()`
/// calls (§4.10).
pub fn spawn_conversation_reaper_daemon(conversations: ConversationStateManager) {
    tokio::spawn(async move {
        let mut ticker = interval(CONVERSATION_REAP_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let evicted = conversations.evict_expired().await;
            if evicted > 0 {
                info!(evicted, "reaped expired conversation entries");
            }
        }
    });
}
