//! Per-surface conversation state machine.
//!
//! Each surface (chat, cricket, image) holds an ordered message log seeded
//! with a welcome message. A send appends the user turn plus a pending
//! placeholder and blocks further sends until the placeholder is resolved.

use crate::history::{build_context, HISTORY_WINDOW};
use shared::chat_api::{HistoryEntry, Message};
use thiserror::Error;

/// One conversation surface of the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    Chat,
    Cricket,
    Image,
}

impl Surface {
    pub const ALL: [Surface; 3] = [Surface::Chat, Surface::Cricket, Surface::Image];

    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::Chat => "chat",
            Surface::Cricket => "cricket",
            Surface::Image => "image",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Surface::Chat => "Chat",
            Surface::Cricket => "Cricket Bot",
            Surface::Image => "Image Generator",
        }
    }

    /// Durable-store key for this surface's conversation log.
    pub fn history_key(&self) -> &'static str {
        match self {
            Surface::Chat => "chatHistory",
            Surface::Cricket => "cricketHistory",
            Surface::Image => "imageHistory",
        }
    }

    pub fn welcome(&self, user_name: Option<&str>) -> String {
        let name = user_name.unwrap_or("there");
        match self {
            Surface::Chat => format!(
                "Hi {name}! I'm your AI assistant. Ask me anything to get started."
            ),
            Surface::Cricket => format!(
                "Hi {name}! I'm your cricket assistant. Ask me about matches, players, or the laws of the game."
            ),
            Surface::Image => "🎨 Welcome to the AI Image Generator! Describe the image you want to create, and I'll generate it for you. Be as detailed as possible for best results!".to_string(),
        }
    }

    fn cleared_notice(&self) -> &'static str {
        match self {
            Surface::Chat => "Chat cleared! What would you like to talk about next?",
            Surface::Cricket => "Chat cleared! What else would you like to know about cricket?",
            Surface::Image => "🎨 Chat cleared! Describe your next image creation!",
        }
    }
}

/// Local rejections; these never mutate the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("message text is blank")]
    BlankInput,
    #[error("a response is already pending")]
    Busy,
}

/// Snapshot handed to the dispatcher: the input plus the history as it
/// stood before this turn was appended.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub input_text: String,
    pub history: Vec<HistoryEntry>,
}

pub struct Conversation {
    surface: Surface,
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(surface: Surface, user_name: Option<&str>) -> Self {
        Self {
            surface,
            messages: vec![Message::welcome(surface.welcome(user_name))],
        }
    }

    /// Restores a persisted log; an empty log falls back to a fresh seed.
    pub fn from_messages(surface: Surface, messages: Vec<Message>, user_name: Option<&str>) -> Self {
        if messages.is_empty() {
            return Self::new(surface, user_name);
        }
        let mut convo = Self { surface, messages };
        // A placeholder can only be persisted by a crash mid-send; drop it.
        convo.messages.retain(|m| !m.is_pending);
        convo
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// True while a placeholder is outstanding.
    pub fn is_awaiting(&self) -> bool {
        self.messages.iter().any(|m| m.is_pending)
    }

    /// Starts a turn: rejects blank input and concurrent sends, otherwise
    /// snapshots the outbound context (computed before this turn is
    /// visible), then appends the user message and the placeholder.
    pub fn begin_send(&mut self, text: &str) -> Result<Outbound, SendError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SendError::BlankInput);
        }
        if self.is_awaiting() {
            return Err(SendError::Busy);
        }
        let history = build_context(&self.messages, HISTORY_WINDOW);
        self.messages.push(Message::user(text));
        self.messages.push(Message::pending());
        Ok(Outbound {
            input_text: text.to_string(),
            history,
        })
    }

    /// Applies a resolved turn: the placeholder goes, the message lands.
    /// A late resolution after `clear` still lands (accepted race).
    pub fn resolve(&mut self, message: Message) {
        self.messages.retain(|m| !m.is_pending);
        self.messages.push(message);
    }

    /// Discards the log and reseeds with the cleared notice. An in-flight
    /// request is not cancelled; its resolution will still be applied.
    pub fn clear(&mut self) {
        self.messages = vec![Message::welcome(self.surface.cleared_notice())];
    }

    /// Fresh start with the full welcome, e.g. after sign-out.
    pub fn reset(&mut self, user_name: Option<&str>) {
        self.messages = vec![Message::welcome(self.surface.welcome(user_name))];
    }
}
