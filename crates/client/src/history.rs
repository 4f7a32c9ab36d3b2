//! Conversation history windowing policy.
//!
//! Bounds what the backend sees: the welcome message and any pending
//! placeholder are dropped, only the most recent window survives, and each
//! survivor is projected down to `{role, content}`.

use shared::chat_api::{HistoryEntry, Message, WELCOME_ID};

/// Maximum turns forwarded to the backend per request.
pub const HISTORY_WINDOW: usize = 10;

/// Pure projection of a message log into the outbound context. Order is
/// chronological; entries beyond `limit` are dropped from the old end.
pub fn build_context(messages: &[Message], limit: usize) -> Vec<HistoryEntry> {
    let kept: Vec<&Message> = messages
        .iter()
        .filter(|m| !m.is_pending && m.id != WELCOME_ID)
        .collect();
    let start = kept.len().saturating_sub(limit);
    kept[start..].iter().map(|m| HistoryEntry::from(*m)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::chat_api::Role;

    fn log_with(count: usize) -> Vec<Message> {
        let mut messages = vec![Message::welcome("welcome aboard")];
        for i in 0..count {
            if i % 2 == 0 {
                messages.push(Message::user(format!("q{i}")));
            } else {
                messages.push(Message::assistant(format!("a{i}")));
            }
        }
        messages
    }

    #[test]
    fn test_excludes_welcome_and_pending() {
        let mut messages = log_with(2);
        messages.push(Message::pending());

        let context = build_context(&messages, HISTORY_WINDOW);
        assert_eq!(context.len(), 2);
        assert!(context.iter().all(|e| !e.content.contains("welcome")));
    }

    #[test]
    fn test_keeps_most_recent_window_in_order() {
        let messages = log_with(14);
        let context = build_context(&messages, HISTORY_WINDOW);
        assert_eq!(context.len(), 10);
        // Oldest four turns dropped, order preserved.
        assert_eq!(context.first().unwrap().content, "q4");
        assert_eq!(context.last().unwrap().content, "a13");
    }

    #[test]
    fn test_projects_to_role_and_content_only() {
        let messages = vec![
            Message::welcome("hello"),
            Message::assistant_with_images("caption", vec!["http://img/1.png".into()]),
        ];
        let context = build_context(&messages, HISTORY_WINDOW);
        assert_eq!(
            context,
            vec![HistoryEntry {
                role: Role::Assistant,
                content: "caption".into(),
            }]
        );
    }

    #[test]
    fn test_idempotent_on_unchanged_log() {
        let messages = log_with(5);
        assert_eq!(
            build_context(&messages, HISTORY_WINDOW),
            build_context(&messages, HISTORY_WINDOW)
        );
    }

    #[test]
    fn test_empty_log_yields_empty_context() {
        assert!(build_context(&[], HISTORY_WINDOW).is_empty());
    }
}
