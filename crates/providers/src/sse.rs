//! Incremental SSE parser for the streaming chat endpoint.
//!
//! The backend streams plain text fragments as server-sent events: blocks
//! separated by `\n\n`, each carrying one or more `data:` lines.

/// A single parsed SSE event.
#[derive(Debug, Clone)]
pub struct SseEvent {
    /// The joined `data:` payload.
    pub data: String,
}

/// Buffers incomplete lines across HTTP chunk boundaries and yields complete
/// events as they close.
#[derive(Default)]
pub struct SseParser {
    buffer: String,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes from the response body. Returns any complete events.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut events = Vec::new();
        while let Some(boundary) = self.buffer.find("\n\n") {
            let block = self.buffer[..boundary].to_string();
            self.buffer.drain(..boundary + 2);

            let data_lines: Vec<&str> = block
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(|val| val.strip_prefix(' ').unwrap_or(val))
                .collect();
            // Blocks without data (comments, id:, retry:) carry nothing.
            if !data_lines.is_empty() {
                events.push(SseEvent {
                    data: data_lines.join("\n"),
                });
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_consecutive_events() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: hello\n\ndata: world\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "hello");
        assert_eq!(events[1].data, "world");
    }

    #[test]
    fn test_buffers_across_chunk_boundaries() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: hel").is_empty());
        let events = parser.feed(b"lo\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hello");
    }

    #[test]
    fn test_joins_multiline_data() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: first\ndata: second\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "first\nsecond");
    }

    #[test]
    fn test_ignores_comments_and_other_fields() {
        let mut parser = SseParser::new();
        let events = parser.feed(b": keepalive\n\nid: 7\nretry: 100\n\ndata: x\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "x");
    }
}
