use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;

use crate::services::audit_log::AuditLog;

/// Bounds the in-flight SSE buffer to roughly one response's worth of
/// events (§4.7 backpressure: "buffers at most one full response in
/// memory per request"). When full, `thinking` events are dropped;
/// `delta` events always wait for room.
const STREAM_BUFFER_CAPACITY: usize = 256;

/// Chunk size (in bytes, at a char boundary) for splitting a finished
/// agent response into incremental `delta` events.
const DELTA_CHUNK_SIZE: usize = 48;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThinkingStatus {
    InProgress,
    Completed,
    Failed,
}

/// One SSE payload emitted by the multiplexer (§4.7 contract).
pub enum StreamEvent {
    Thinking { step: &'static str, message: String, status: ThinkingStatus, duration_ms: Option<u64> },
    Delta { content: String },
    Terminal { content: String, thread_id: String },
    Done,
}

impl StreamEvent {
    pub fn into_sse_data(self) -> Option<String> {
        match self {
            StreamEvent::Thinking { step, message, status, duration_ms } => Some(
                json!({
                    "type": "thinking",
                    "step": step,
                    "message": message,
                    "status": status,
                    "timestamp": Utc::now(),
                    "duration_ms": duration_ms,
                })
                .to_string(),
            ),
            StreamEvent::Delta { content } => {
                Some(json!({ "choices": [{ "delta": { "content": content } }] }).to_string())
            }
            StreamEvent::Terminal { content, thread_id } => Some(
                json!({
                    "choices": [{ "delta": { "content": "" }, "message": { "content": content } }],
                    "threadId": thread_id,
                })
                .to_string(),
            ),
            StreamEvent::Done => None,
        }
    }

    pub fn is_sentinel_done(&self) -> bool {
        matches!(self, StreamEvent::Done)
    }
}

/// Sending half of an SSE stream's event channel. `thinking` events
/// are best-effort; `delta`/`terminal`/`done` events always deliver.
#[derive(Clone)]
pub struct StreamSink {
    sender: mpsc::Sender<StreamEvent>,
    audit: AuditLog,
    customer_id: String,
    thread_id: String,
}

impl StreamSink {
    pub fn new(audit: AuditLog, customer_id: String, thread_id: String) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (sender, receiver) = mpsc::channel(STREAM_BUFFER_CAPACITY);
        (Self { sender, audit, customer_id, thread_id }, receiver)
    }

    pub fn thinking(&self, step: &'static str, message: impl Into<String>, status: ThinkingStatus, duration_ms: Option<u64>) {
        let event = StreamEvent::Thinking { step, message: message.into(), status, duration_ms };
        if self.sender.try_send(event).is_err() {
            self.audit.record(orchestrator_models::AuditRecord::new(
                &self.customer_id,
                &self.thread_id,
                orchestrator_models::EventType::StreamDrop,
                json!({ "dropped_thinking_event": step }),
            ));
        }
    }

    pub async fn content_response(&self, full_content: &str, thread_id: &str) {
        let deduped = dedupe_html_tables(full_content);
        for chunk in chunk_text(&deduped, DELTA_CHUNK_SIZE) {
            let _ = self.sender.send(StreamEvent::Delta { content: chunk }).await;
        }
        let _ = self
            .sender
            .send(StreamEvent::Terminal { content: deduped, thread_id: thread_id.to_string() })
            .await;
    }

    pub async fn done(&self) {
        let _ = self.sender.send(StreamEvent::Done).await;
    }
}

/// Splits `content` into chunks no larger than `chunk_size` bytes,
/// always at a UTF-8 char boundary, so delta concatenation equals the
/// original content exactly (I6).
fn chunk_text(content: &str, chunk_size: usize) -> Vec<String> {
    if content.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let bytes_len = content.len();

    while start < bytes_len {
        let mut end = (start + chunk_size).min(bytes_len);
        while end < bytes_len && !content.is_char_boundary(end) {
            end += 1;
        }
        chunks.push(content[start..end].to_string());
        start = end;
    }

    chunks
}

/// Keeps only the first `<table>...</table>` block in `content`,
/// eliding every subsequent one (§4.7 dedup, I7).
fn dedupe_html_tables(content: &str) -> String {
    let mut result = String::with_capacity(content.len());
    let mut remaining = content;
    let mut seen_table = false;

    loop {
        let Some(start) = remaining.find("<table") else {
            result.push_str(remaining);
            break;
        };

        result.push_str(&remaining[..start]);

        match remaining[start..].find("</table>") {
            Some(close_rel) => {
                let close_end = start + close_rel + "</table>".len();
                if !seen_table {
                    result.push_str(&remaining[start..close_end]);
                }
                seen_table = true;
                remaining = &remaining[close_end..];
            }
            None => {
                if !seen_table {
                    result.push_str(&remaining[start..]);
                }
                break;
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunking_concatenates_back_to_original() {
        let content = "The quick brown fox jumps over the lazy dog, a sentence longer than one chunk.";
        let chunks = chunk_text(content, 10);
        assert_eq!(chunks.concat(), content);
    }

    #[test]
    fn dedupe_keeps_only_first_table() {
        let content = "before<table>one</table>middle<table>two</table>after";
        let deduped = dedupe_html_tables(content);
        assert_eq!(deduped.matches("<table>").count(), 1);
        assert!(deduped.contains("before"));
        assert!(deduped.contains("middle"));
        assert!(deduped.contains("after"));
        assert!(!deduped.contains("two"));
    }

    #[test]
    fn dedupe_passes_through_content_with_no_tables() {
        let content = "just plain text";
        assert_eq!(dedupe_html_tables(content), content);
    }
}
