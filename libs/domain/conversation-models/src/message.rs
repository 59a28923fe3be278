use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn is_user(&self) -> bool {
        matches!(self.role, Role::User)
    }
}

/// Request body for `POST /chat` (§6.1).
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationRequest {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub stream: bool,
}

impl ConversationRequest {
    /// Last user message, if any. The router and the continuation
    /// detector only ever look at this one message.
    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_user())
    }

    /// Derives `thread_{customer_id}` when the client sent no thread id
    /// on the first turn (§3 ConversationRequest).
    pub fn thread_id_or_derive(&self, customer_id: &str) -> String {
        self.thread_id
            .clone()
            .unwrap_or_else(|| format!("thread_{customer_id}"))
    }
}
