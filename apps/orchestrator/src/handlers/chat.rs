use std::convert::Infallible;
use std::time::Instant;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use futures::{Stream, StreamExt};
use orchestrator_models::{ConversationRequest, Message, OrchestratorError, Principal};
use serde_json::json;
use tokio_stream::wrappers::ReceiverStream;
use tracing::instrument;

use crate::services::continuation_detector::is_continuation;
use crate::services::stream_multiplexer::{StreamSink, ThinkingStatus};
use crate::services::supervisor_router::RouterOutcome;
use crate::state::AppState;

/// `POST /chat` (§6.1). Streaming responses are produced by a
/// background task feeding a [`StreamSink`]; non-streaming responses
/// run the identical pipeline inline and return the terminal payload.
#[instrument(skip(state, request), fields(customer_id = %principal.customer_id))]
pub async fn chat(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<ConversationRequest>,
) -> Result<Response, OrchestratorError> {
    if request.messages.is_empty() {
        return Err(OrchestratorError::BadRequest("messages must not be empty".to_string()));
    }

    if request.stream {
        Ok(stream_chat(state, principal, request).into_response())
    } else {
        let thread_id = request.thread_id_or_derive(&principal.customer_id);
        let outcome = run_pipeline(&state, &principal, &request, &thread_id, None).await;
        match outcome {
            Ok((content, resolved_thread_id)) => Ok(Json(json!({
                "choices": [{ "delta": { "content": "" }, "message": { "content": content } }],
                "threadId": resolved_thread_id,
            }))
            .into_response()),
            Err(err) => Err(err),
        }
    }
}

fn stream_chat(
    state: AppState,
    principal: Principal,
    request: ConversationRequest,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let thread_id = request.thread_id_or_derive(&principal.customer_id);
    let (sink, receiver) = StreamSink::new(state.audit.clone(), principal.customer_id.clone(), thread_id.clone());

    tokio::spawn(async move {
        let outcome = run_pipeline(&state, &principal, &request, &thread_id, Some(sink.clone())).await;

        match outcome {
            Ok((content, resolved_thread_id)) => {
                sink.content_response(&content, &resolved_thread_id).await;
            }
            Err(err) => {
                sink.thinking("dispatch", err.to_string(), ThinkingStatus::Failed, None);
                sink.content_response(&err.to_string(), &thread_id).await;
            }
        }
        sink.done().await;
    });

    let event_stream = ReceiverStream::new(receiver).filter_map(|event| {
        if event.is_sentinel_done() {
            Some(Ok(Event::default().data("[DONE]")))
        } else {
            event.into_sse_data().map(|data| Ok(Event::default().data(data)))
        }
    });

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}

/// Runs the continuation-bypass-then-router-then-dispatch pipeline
/// shared by streaming and non-streaming requests (§4.8). Returns the
/// agent's final text and the resolved thread id.
async fn run_pipeline(
    state: &AppState,
    principal: &Principal,
    request: &ConversationRequest,
    thread_id: &str,
    sink: Option<StreamSink>,
) -> Result<(String, String), OrchestratorError> {
    emit(&sink, "auth", "principal resolved", ThinkingStatus::Completed, None);

    let last_user_message = request
        .last_user_message()
        .map(|message| message.content.clone())
        .unwrap_or_default();

    let is_continuation_message = is_continuation(&last_user_message);
    let live_entry = state.conversations.active(&principal.customer_id).await;

    let (agent_endpoint, rewritten_message, dispatch_thread_id, is_bypass, bypass_agent_name) =
        if is_continuation_message && live_entry.is_some() {
            let entry = live_entry.expect("checked above");
            emit(&sink, "routing", "continuation bypass", ThinkingStatus::Completed, None);
            state.audit.record(orchestrator_models::AuditRecord::new(
                &principal.customer_id,
                &entry.thread_id,
                orchestrator_models::EventType::ContinuationBypass,
                json!({ "agent": entry.agent_name }),
            ));
            (
                entry.agent_endpoint.clone(),
                last_user_message.clone(),
                entry.thread_id.clone(),
                true,
                Some(entry.agent_name.clone()),
            )
        } else {
            emit(&sink, "cache_lookup", "checking cache", ThinkingStatus::InProgress, None);
            let cache_started = Instant::now();
            let outcome = state.router.route(&last_user_message, principal).await;

            match outcome {
                RouterOutcome::CacheServe { response_text } => {
                    emit(
                        &sink,
                        "cache_lookup",
                        "served from cache",
                        ThinkingStatus::Completed,
                        Some(cache_started.elapsed().as_millis() as u64),
                    );
                    return Ok((response_text, thread_id.to_string()));
                }
                RouterOutcome::Dispatch { agent_endpoint, rewritten_message, .. } => {
                    emit(&sink, "cache_lookup", "no cache short-circuit", ThinkingStatus::Completed, None);
                    emit(&sink, "routing", "agent selected", ThinkingStatus::Completed, None);
                    (agent_endpoint, rewritten_message, thread_id.to_string(), false, None)
                }
            }
        };

    emit(&sink, "dispatch", "invoking agent", ThinkingStatus::InProgress, None);
    let dispatch_started = Instant::now();

    let messages = with_last_user_message_replaced(&request.messages, &rewritten_message);
    let dispatch_result = state
        .dispatcher
        .dispatch(&agent_endpoint, &messages, &dispatch_thread_id, &principal.customer_id, &principal.email)
        .await;

    match dispatch_result {
        Ok(response) => {
            emit(
                &sink,
                "dispatch",
                "agent responded",
                ThinkingStatus::Completed,
                Some(dispatch_started.elapsed().as_millis() as u64),
            );

            if is_bypass {
                let agent_name = bypass_agent_name.unwrap_or_else(|| "unknown".to_string());
                state
                    .conversations
                    .update(&principal.customer_id, &agent_name, &agent_endpoint, &dispatch_thread_id)
                    .await;
            } else {
                let agent_name = state
                    .router
                    .agent_name_for_endpoint(&agent_endpoint)
                    .unwrap_or_else(|| "unknown".to_string());
                state
                    .conversations
                    .update(&principal.customer_id, &agent_name, &agent_endpoint, &response.thread_id)
                    .await;
            }

            Ok((response.response_text, response.thread_id))
        }
        Err(err) => {
            emit(&sink, "dispatch", err.to_string(), ThinkingStatus::Failed, None);
            Err(err)
        }
    }
}

fn emit(sink: &Option<StreamSink>, step: &'static str, message: impl Into<String>, status: ThinkingStatus, duration_ms: Option<u64>) {
    if let Some(sink) = sink {
        sink.thinking(step, message, status, duration_ms);
    }
}

/// Replaces the content of the last user message (§4.5 message
/// rewriting: the payment agent sees the email-prefixed variant, every
/// other message passes through unchanged).
fn with_last_user_message_replaced(messages: &[Message], replacement: &str) -> Vec<Message> {
    let mut messages = messages.to_vec();
    if let Some(last_user) = messages.iter_mut().rev().find(|message| message.is_user()) {
        last_user.content = replacement.to_string();
    }
    messages
}
