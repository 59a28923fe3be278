use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use orchestrator_models::{CacheBundle, Principal};
use tokio::fs;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::services::audit_log::AuditLog;
use crate::services::cache_populator::CachePopulator;

/// Result of `POST /cache/initialize` (§6.1: `"ok"|"in_flight"|"valid"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheInitStatus {
    Valid,
    InFlight,
    Scheduled,
}

impl CacheInitStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheInitStatus::Valid => "valid",
            CacheInitStatus::InFlight => "in_flight",
            CacheInitStatus::Scheduled => "ok",
        }
    }
}

const BUNDLE_TTL_SECONDS: i64 = 300;
const IN_FLIGHT_WAIT_POLL_INTERVAL: Duration = Duration::from_millis(500);
const IN_FLIGHT_WAIT_MAX_POLLS: u32 = 50;
const SWEEP_MAX_AGE: Duration = Duration::from_secs(3600);

/// Per-customer bounded-TTL cache with atomic writes and in-flight
/// request coalescing (C2, §4.2). Owns the in-flight marker set and
/// the on-disk bundle directory; delegates the actual HTTP fan-out to
/// a [`CachePopulator`].
pub struct CacheStore {
    cache_root: PathBuf,
    in_flight: Arc<Mutex<HashSet<String>>>,
    populator: Arc<CachePopulator>,
    audit: AuditLog,
}

impl CacheStore {
    pub fn new(cache_root: impl Into<PathBuf>, populator: Arc<CachePopulator>, audit: AuditLog) -> Self {
        Self {
            cache_root: cache_root.into(),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            populator,
            audit,
        }
    }

    /// Deletes cache files older than one hour. Run once at boot and
    /// then periodically by the cache sweep daemon (§4.2 persistence).
    pub async fn sweep_stale_files(&self) {
        let mut entries = match fs::read_dir(&self.cache_root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                if let Err(err) = fs::create_dir_all(&self.cache_root).await {
                    warn!(error = %err, "failed to create cache root during sweep");
                }
                return;
            }
            Err(err) => {
                warn!(error = %err, "failed to read cache root during sweep");
                return;
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let Ok(metadata) = entry.metadata().await else { continue };
            let Ok(modified) = metadata.modified() else { continue };
            if modified.elapsed().map(|age| age > SWEEP_MAX_AGE).unwrap_or(false) {
                if fs::remove_file(entry.path()).await.is_ok() {
                    info!(path = ?entry.path(), "swept stale cache file");
                }
            }
        }
    }

    /// Returns a valid bundle, or `None`. Joins an in-flight populate's
    /// wait loop when one is running for this customer (§4.2 `get`).
    #[instrument(skip(self))]
    pub async fn get(&self, customer_id: &str) -> Option<CacheBundle> {
        if self.is_in_flight(customer_id).await {
            return self.wait_for_populate(customer_id).await;
        }
        self.read_valid_bundle(customer_id).await
    }

    /// Deletes the stored bundle and any in-flight marker (C6 write
    /// invalidation, I5).
    #[instrument(skip(self))]
    pub async fn invalidate(&self, customer_id: &str) {
        self.in_flight.lock().await.remove(customer_id);
        let path = self.bundle_path(customer_id);
        if let Err(err) = fs::remove_file(&path).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(error = %err, customer_id = %customer_id, "failed to remove cache bundle");
            }
        }
    }

    /// Idempotent, non-blocking trigger: guarantees a valid bundle
    /// exists, a populate is already in flight, or one has just been
    /// scheduled (§4.2 `ensure_populated`).
    #[instrument(skip(self, principal))]
    pub async fn ensure_populated(&self, customer_id: &str, principal: Principal) -> CacheInitStatus {
        if self.read_valid_bundle(customer_id).await.is_some() {
            return CacheInitStatus::Valid;
        }

        if !self.begin_populate(customer_id).await {
            return CacheInitStatus::InFlight;
        }

        let customer_id = customer_id.to_string();
        let cache_root = self.cache_root.clone();
        let populator = self.populator.clone();
        let audit = self.audit.clone();
        let in_flight = self.in_flight.clone();

        tokio::spawn(async move {
            let result = populator.populate(&customer_id, &principal).await;
            match result {
                Ok(bundle) => {
                    if let Err(err) = write_bundle_atomically(&cache_root, &bundle).await {
                        warn!(error = %err, customer_id = %customer_id, "failed to persist populated bundle");
                    }
                }
                Err(err) => {
                    warn!(error = %err, customer_id = %customer_id, "cache populate failed");
                    audit.record(orchestrator_models::AuditRecord::new(
                        &customer_id,
                        "",
                        orchestrator_models::EventType::CachePopulateFail,
                        serde_json::json!({ "reason": err.to_string() }),
                    ));
                }
            }
            in_flight.lock().await.remove(&customer_id);
        });

        CacheInitStatus::Scheduled
    }

    async fn is_in_flight(&self, customer_id: &str) -> bool {
        self.in_flight.lock().await.contains(customer_id)
    }

    /// Atomic check-and-insert: returns `true` iff this call newly
    /// claimed the marker (§9: "a single mutex region, not two
    /// independent operations").
    async fn begin_populate(&self, customer_id: &str) -> bool {
        self.in_flight.lock().await.insert(customer_id.to_string())
    }

    async fn wait_for_populate(&self, customer_id: &str) -> Option<CacheBundle> {
        for _ in 0..IN_FLIGHT_WAIT_MAX_POLLS {
            sleep(IN_FLIGHT_WAIT_POLL_INTERVAL).await;
            if !self.is_in_flight(customer_id).await {
                return self.read_valid_bundle(customer_id).await;
            }
        }
        self.read_valid_bundle(customer_id).await
    }

    async fn read_valid_bundle(&self, customer_id: &str) -> Option<CacheBundle> {
        let path = self.bundle_path(customer_id);
        let bytes = fs::read(&path).await.ok()?;
        let bundle: CacheBundle = serde_json::from_slice(&bytes).ok()?;
        if bundle.is_valid(Utc::now()) {
            Some(bundle)
        } else {
            None
        }
    }

    fn bundle_path(&self, customer_id: &str) -> PathBuf {
        self.cache_root.join(format!("{customer_id}.json"))
    }
}

pub const DEFAULT_BUNDLE_TTL_SECONDS: i64 = BUNDLE_TTL_SECONDS;

async fn write_bundle_atomically(cache_root: &Path, bundle: &CacheBundle) -> std::io::Result<()> {
    fs::create_dir_all(cache_root).await?;
    let final_path = cache_root.join(format!("{}.json", bundle.customer_id));
    let temp_path = cache_root.join(format!(".{}.{}.tmp", bundle.customer_id, Uuid::new_v4()));

    let body = serde_json::to_vec_pretty(bundle).map_err(|err| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, err)
    })?;
    fs::write(&temp_path, body).await?;
    fs::rename(&temp_path, &final_path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::audit_log::AuditLog;
    use orchestrator_models::CacheData;
    use orchestrator_downstream::DataServiceClient;

    fn sample_bundle(customer_id: &str, created_at: chrono::DateTime<Utc>, ttl_seconds: i64) -> CacheBundle {
        CacheBundle {
            customer_id: customer_id.to_string(),
            created_at,
            ttl_seconds,
            data: CacheData::default(),
        }
    }

    fn test_store(cache_root: &Path) -> CacheStore {
        let audit = AuditLog::spawn(cache_root.join("audit").to_string_lossy().to_string());
        let data_services = DataServiceClient::new(
            "http://127.0.0.1:1/accounts",
            "http://127.0.0.1:1/transactions",
            "http://127.0.0.1:1/contacts",
            "http://127.0.0.1:1/limits",
        );
        let populator = Arc::new(CachePopulator::new(data_services, audit.clone()));
        CacheStore::new(cache_root, populator, audit)
    }

    #[tokio::test]
    async fn atomic_write_then_read_round_trips_a_valid_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = sample_bundle("C001", Utc::now(), 300);
        write_bundle_atomically(dir.path(), &bundle).await.unwrap();

        let store = test_store(dir.path());
        let read_back = store.read_valid_bundle("C001").await.expect("bundle present and valid");
        assert_eq!(read_back.customer_id, "C001");
    }

    #[tokio::test]
    async fn expired_bundle_on_disk_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let stale = sample_bundle("C001", Utc::now() - chrono::Duration::seconds(400), 300);
        write_bundle_atomically(dir.path(), &stale).await.unwrap();

        let store = test_store(dir.path());
        assert!(store.read_valid_bundle("C001").await.is_none());
    }

    #[tokio::test]
    async fn invalidate_removes_the_stored_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = sample_bundle("C001", Utc::now(), 300);
        write_bundle_atomically(dir.path(), &bundle).await.unwrap();

        let store = test_store(dir.path());
        assert!(store.get("C001").await.is_some());

        store.invalidate("C001").await;
        assert!(store.read_valid_bundle("C001").await.is_none());
    }

    #[tokio::test]
    async fn in_flight_marker_insertion_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path());

        assert!(store.begin_populate("C001").await);
        assert!(!store.begin_populate("C001").await, "second claim must observe the marker already set");

        store.in_flight.lock().await.remove("C001");
        assert!(store.begin_populate("C001").await, "marker is claimable again once released");
    }

    #[tokio::test]
    async fn sweep_leaves_fresh_files_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let fresh_path = dir.path().join("fresh.json");
        fs::write(&fresh_path, b"{}").await.unwrap();

        let store = test_store(dir.path());
        store.sweep_stale_files().await;

        assert!(fresh_path.exists(), "a file written moments ago must survive the sweep");
    }
}
