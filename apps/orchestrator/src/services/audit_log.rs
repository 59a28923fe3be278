use std::path::PathBuf;

use orchestrator_models::AuditRecord;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{error, warn};

/// Append-only JSON-lines audit sink (C9). The writer side is a single
/// background task draining an unbounded queue, so no request-handling
/// task ever blocks on disk I/O to log a decision (§5 shared-resource
/// discipline).
#[derive(Clone)]
pub struct AuditLog {
    sender: mpsc::UnboundedSender<AuditRecord>,
}

impl AuditLog {
    /// Spawns the draining task and returns the handle used to submit
    /// records. `audit_root` is created if missing.
    pub fn spawn(audit_root: impl Into<String>) -> Self {
        let audit_root = audit_root.into();
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(drain_loop(audit_root, receiver));
        Self { sender }
    }

    /// Non-blocking: enqueues the record for the writer task.
    pub fn record(&self, record: AuditRecord) {
        if self.sender.send(record).is_err() {
            error!("audit log writer task is gone, dropping record");
        }
    }
}

async fn drain_loop(audit_root: String, mut receiver: mpsc::UnboundedReceiver<AuditRecord>) {
    if let Err(err) = fs::create_dir_all(&audit_root).await {
        error!(error = %err, audit_root = %audit_root, "failed to create audit root");
    }

    while let Some(record) = receiver.recv().await {
        if let Err(err) = append_record(&audit_root, &record).await {
            warn!(error = %err, "failed to append audit record");
        }
    }
}

async fn append_record(audit_root: &str, record: &AuditRecord) -> std::io::Result<()> {
    let file_path = path_for_day(audit_root, record.timestamp.date_naive());
    let line = serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string());

    let mut file = OpenOptions::new().create(true).append(true).open(&file_path).await?;
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await
}

fn path_for_day(audit_root: &str, day: chrono::NaiveDate) -> PathBuf {
    PathBuf::from(audit_root).join(format!("orchestrator-{}.ndjson", day.format("%Y-%m-%d")))
}
