//! Message and wire types shared between the conversation layer and the
//! backend client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reserved id for the fixed welcome message. Never produced by the UUID
/// path and always excluded from the history sent to the backend.
pub const WELCOME_ID: &str = "welcome";

/// Who produced a conversational turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One conversational turn as held by a conversation surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// True only for the transient "response pending" placeholder.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_pending: bool,
    /// Generated-image references; non-empty only on successful image
    /// generation results.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_urls: Vec<String>,
}

fn is_false(v: &bool) -> bool {
    !v
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            is_pending: false,
            image_urls: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Assistant message carrying generated image references.
    pub fn assistant_with_images(content: impl Into<String>, image_urls: Vec<String>) -> Self {
        let mut msg = Self::new(Role::Assistant, content);
        msg.image_urls = image_urls;
        msg
    }

    /// The transient placeholder shown while a response is outstanding.
    pub fn pending() -> Self {
        let mut msg = Self::new(Role::Assistant, "");
        msg.is_pending = true;
        msg
    }

    /// The fixed introductory message seeding a conversation. Uses the
    /// reserved id so the history policy can recognize it.
    pub fn welcome(content: impl Into<String>) -> Self {
        let mut msg = Self::new(Role::Assistant, content);
        msg.id = WELCOME_ID.to_string();
        msg
    }
}

/// The `{role, content}` projection of a message sent to the backend.
/// Timestamps, ids and attachments are never forwarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for HistoryEntry {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role,
            content: msg.content.clone(),
        }
    }
}

/// Request body for the chat, cricket and image endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub input_text: String,
    pub conversation_history: Vec<HistoryEntry>,
}

/// Structured reply from the cricket endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CricketReply {
    pub content: String,
}

/// A fragment delivered by the streaming chat endpoint.
#[derive(Debug, Clone)]
pub enum StreamChunk {
    Text(String),
    /// Stream broke after it had started; terminal.
    Error(String),
    Done,
}
