//! HTTP client for the AI backend.
//!
//! Maps a capability (chat, cricket, image generation) to the right
//! endpoint, attaches the session credential, and normalizes every outcome
//! into an assistant [`Message`]. Transport and server failures never
//! escape [`BackendClient::send_message`]; they come back as inline error
//! messages so the conversation layer has no separate error path.

use anyhow::{anyhow, Result};
use futures::StreamExt;
use reqwest::Client;
use shared::chat_api::{ChatRequest, CricketReply, HistoryEntry, Message, StreamChunk};
use shared::credentials::CredentialStore;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

static SHARED_HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .pool_max_idle_per_host(2)
        .build()
        .expect("failed to build HTTP client")
});

const API_KEY_HEADER: &str = "X-API-Key";

const CHAT_FALLBACK: &str =
    "Unable to connect to the server. Please make sure the backend is running.";
const CRICKET_FALLBACK: &str =
    "Unable to connect to the cricket service. Please make sure the backend is running.";
const IMAGE_FALLBACK: &str = "Unable to generate image. Please try again after some time.";

/// One of the three backend functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Chat,
    Cricket,
    /// Image generation; `count` is clamped to at least 1.
    Image { count: u32 },
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Chat => "chat",
            Capability::Cricket => "cricket",
            Capability::Image { .. } => "image",
        }
    }

    /// Generic message used when a failure carries no detail of its own.
    fn fallback(&self) -> &'static str {
        match self {
            Capability::Chat => CHAT_FALLBACK,
            Capability::Cricket => CRICKET_FALLBACK,
            Capability::Image { .. } => IMAGE_FALLBACK,
        }
    }
}

pub struct BackendClient {
    http: Client,
    base_url: String,
    credentials: Arc<CredentialStore>,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, credentials: Arc<CredentialStore>) -> Self {
        Self {
            http: SHARED_HTTP.clone(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// Dispatches one request and always resolves to an assistant message.
    ///
    /// Without a configured credential this short-circuits before any
    /// network activity.
    pub async fn send_message(
        &self,
        capability: Capability,
        input_text: &str,
        history: &[HistoryEntry],
    ) -> Message {
        let api_key = match self.api_key() {
            Some(key) => key,
            None => {
                tracing::warn!(capability = capability.as_str(), "dispatch without credentials");
                return Message::assistant("Error: API key not configured");
            }
        };

        let result = match capability {
            Capability::Chat => self.chat(&api_key, input_text, history).await,
            Capability::Cricket => self.cricket(&api_key, input_text, history).await,
            Capability::Image { count } => {
                self.images(&api_key, input_text, history, count.max(1)).await
            }
        };

        match result {
            Ok(message) => {
                tracing::debug!(capability = capability.as_str(), "dispatch resolved");
                message
            }
            Err(err) => {
                tracing::warn!(capability = capability.as_str(), error = %err, "dispatch failed");
                let detail = err.to_string();
                let detail = if detail.trim().is_empty() {
                    capability.fallback().to_string()
                } else {
                    detail
                };
                Message::assistant(format!("Error: {detail}"))
            }
        }
    }

    async fn chat(&self, api_key: &str, input_text: &str, history: &[HistoryEntry]) -> Result<Message> {
        let resp = self
            .post_json(&format!("{}/chat", self.base_url), api_key, input_text, history)
            .await?;
        let resp = ensure_success(resp, CHAT_FALLBACK).await?;
        let text = resp.text().await?;
        Ok(Message::assistant(text))
    }

    async fn cricket(
        &self,
        api_key: &str,
        input_text: &str,
        history: &[HistoryEntry],
    ) -> Result<Message> {
        let resp = self
            .post_json(
                &format!("{}/chat/cricket", self.base_url),
                api_key,
                input_text,
                history,
            )
            .await?;
        let resp = ensure_success(resp, CRICKET_FALLBACK).await?;
        let reply: CricketReply = resp.json().await?;
        Ok(Message::assistant(reply.content))
    }

    async fn images(
        &self,
        api_key: &str,
        input_text: &str,
        history: &[HistoryEntry],
        count: u32,
    ) -> Result<Message> {
        let body = ChatRequest {
            input_text: input_text.to_string(),
            conversation_history: history.to_vec(),
        };
        let resp = self
            .http
            .post(format!("{}/chat/images", self.base_url))
            .query(&[("numberOfImages", count)])
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await?;
        let resp = ensure_success(resp, IMAGE_FALLBACK).await?;
        let urls: Vec<String> = resp.json().await?;
        let caption = if urls.len() > 1 {
            "🎨 Image generated successfully! Here are your images:"
        } else {
            "🎨 Image generated successfully! Here is your image:"
        };
        Ok(Message::assistant_with_images(caption, urls))
    }

    /// Streaming chat variant over the `/chat/stream` SSE endpoint.
    ///
    /// Contract: if the connection fails *before* any fragment arrives,
    /// returns `Err(...)`. Once streaming has started, failures are sent as
    /// [`StreamChunk::Error`] and the method returns `Ok(())`. Dropping the
    /// receiver cancels the stream.
    pub async fn stream_chat(
        &self,
        input_text: &str,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<()> {
        let api_key = self
            .api_key()
            .ok_or_else(|| anyhow!("API key not configured"))?;
        let resp = self
            .http
            .get(format!("{}/chat/stream", self.base_url))
            .query(&[("inputText", input_text)])
            .header(API_KEY_HEADER, &api_key)
            .header("Accept", "text/event-stream")
            .send()
            .await?;
        let resp = ensure_success(resp, CHAT_FALLBACK).await?;

        let mut parser = crate::sse::SseParser::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(err) => {
                    let _ = tx.send(StreamChunk::Error(format!("stream read error: {err}")));
                    return Ok(());
                }
            };
            for event in parser.feed(&bytes) {
                if tx.send(StreamChunk::Text(event.data)).is_err() {
                    // Receiver dropped: caller cancelled.
                    return Ok(());
                }
            }
        }
        let _ = tx.send(StreamChunk::Done);
        Ok(())
    }

    fn api_key(&self) -> Option<String> {
        self.credentials
            .get()
            .map(|r| r.api_key)
            .filter(|k| !k.is_empty())
    }

    async fn post_json(
        &self,
        url: &str,
        api_key: &str,
        input_text: &str,
        history: &[HistoryEntry],
    ) -> Result<reqwest::Response> {
        let body = ChatRequest {
            input_text: input_text.to_string(),
            conversation_history: history.to_vec(),
        };
        Ok(self
            .http
            .post(url)
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await?)
    }
}

/// Turns a non-success response into an error carrying up to 800 chars of
/// body detail, or the capability fallback when the body is empty.
async fn ensure_success(resp: reqwest::Response, fallback: &str) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let detail: String = body.chars().take(800).collect();
    if detail.trim().is_empty() {
        tracing::warn!(%status, "backend returned empty error body");
        return Err(anyhow!("{fallback}"));
    }
    Err(anyhow!("backend error: {status}\n{detail}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::chat_api::Role;
    use shared::credentials::CredentialRecord;
    use shared::storage::{MemoryStore, SessionStore};
    use std::io::Read;
    use std::sync::mpsc;
    use std::thread;

    struct Seen {
        path: String,
        api_key: Option<String>,
        body: String,
    }

    /// Serves exactly one request on a loopback port and reports what it saw.
    fn spawn_server(status: u16, body: &'static str, content_type: &'static str) -> (String, mpsc::Receiver<Seen>) {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let base = format!("http://{}", server.server_addr().to_ip().unwrap());
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut request = server.recv().unwrap();
            let mut req_body = String::new();
            let _ = request.as_reader().read_to_string(&mut req_body);
            let api_key = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("X-API-Key"))
                .map(|h| h.value.as_str().to_string());
            let seen = Seen {
                path: request.url().to_string(),
                api_key,
                body: req_body,
            };
            let response = tiny_http::Response::from_string(body)
                .with_status_code(status)
                .with_header(
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes())
                        .unwrap(),
                );
            let _ = request.respond(response);
            let _ = tx.send(seen);
        });
        (base, rx)
    }

    fn configured_credentials() -> Arc<CredentialStore> {
        let creds = Arc::new(CredentialStore::new(
            Arc::new(MemoryStore::new()) as Arc<dyn SessionStore>
        ));
        creds
            .set(CredentialRecord::new("Sam", "sk-test").unwrap())
            .unwrap();
        creds
    }

    fn empty_credentials() -> Arc<CredentialStore> {
        Arc::new(CredentialStore::new(
            Arc::new(MemoryStore::new()) as Arc<dyn SessionStore>
        ))
    }

    #[tokio::test]
    async fn test_chat_returns_raw_text_as_assistant_message() {
        let (base, rx) = spawn_server(200, "Hi there!", "text/plain");
        let client = BackendClient::new(base, configured_credentials());
        let history = vec![HistoryEntry {
            role: Role::User,
            content: "earlier".into(),
        }];

        let msg = client.send_message(Capability::Chat, "Hello", &history).await;
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, "Hi there!");
        assert!(msg.image_urls.is_empty());

        let seen = rx.recv().unwrap();
        assert_eq!(seen.path, "/chat");
        assert_eq!(seen.api_key.as_deref(), Some("sk-test"));
        let body: serde_json::Value = serde_json::from_str(&seen.body).unwrap();
        assert_eq!(body["inputText"], "Hello");
        assert_eq!(body["conversationHistory"][0]["content"], "earlier");
    }

    #[tokio::test]
    async fn test_cricket_unwraps_structured_reply() {
        let (base, rx) = spawn_server(200, r#"{"content":"Howzat!"}"#, "application/json");
        let client = BackendClient::new(base, configured_credentials());

        let msg = client.send_message(Capability::Cricket, "lbw rule?", &[]).await;
        assert_eq!(msg.content, "Howzat!");
        assert_eq!(rx.recv().unwrap().path, "/chat/cricket");
    }

    #[tokio::test]
    async fn test_image_singular_caption_and_attachment() {
        let (base, rx) = spawn_server(200, r#"["http://img/1.png"]"#, "application/json");
        let client = BackendClient::new(base, configured_credentials());

        let msg = client
            .send_message(Capability::Image { count: 1 }, "a red fox", &[])
            .await;
        assert!(msg.content.contains("is your image"));
        assert_eq!(msg.image_urls, vec!["http://img/1.png"]);
        assert!(rx.recv().unwrap().path.contains("numberOfImages=1"));
    }

    #[tokio::test]
    async fn test_image_plural_caption_matches_count() {
        let (base, rx) = spawn_server(
            200,
            r#"["http://img/1.png","http://img/2.png"]"#,
            "application/json",
        );
        let client = BackendClient::new(base, configured_credentials());

        let msg = client
            .send_message(Capability::Image { count: 2 }, "two foxes", &[])
            .await;
        assert!(msg.content.contains("are your images"));
        assert_eq!(msg.image_urls.len(), 2);
        assert!(rx.recv().unwrap().path.contains("numberOfImages=2"));
    }

    #[tokio::test]
    async fn test_image_count_clamped_to_one() {
        let (base, rx) = spawn_server(200, r#"["http://img/1.png"]"#, "application/json");
        let client = BackendClient::new(base, configured_credentials());

        let _ = client
            .send_message(Capability::Image { count: 0 }, "fox", &[])
            .await;
        assert!(rx.recv().unwrap().path.contains("numberOfImages=1"));
    }

    #[tokio::test]
    async fn test_missing_credentials_short_circuits() {
        // Unroutable base: a network attempt would error with a transport
        // message instead of the credential one.
        let client = BackendClient::new("http://127.0.0.1:1", empty_credentials());
        let msg = client.send_message(Capability::Chat, "Hello", &[]).await;
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, "Error: API key not configured");
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_error_message() {
        let client = BackendClient::new("http://127.0.0.1:1", configured_credentials());
        let msg = client
            .send_message(Capability::Image { count: 1 }, "fox", &[])
            .await;
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.content.starts_with("Error: "));
        assert!(msg.content.len() > "Error: ".len());
        assert!(msg.image_urls.is_empty());
    }

    #[tokio::test]
    async fn test_empty_error_body_uses_capability_fallback() {
        let (base, _rx) = spawn_server(500, "", "text/plain");
        let client = BackendClient::new(base, configured_credentials());
        let msg = client.send_message(Capability::Cricket, "hi", &[]).await;
        assert_eq!(
            msg.content,
            format!("Error: {CRICKET_FALLBACK}")
        );
    }

    #[tokio::test]
    async fn test_stream_chat_without_credentials_errors_before_connect() {
        let client = BackendClient::new("http://127.0.0.1:1", empty_credentials());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        assert!(client.stream_chat("Hello", tx).await.is_err());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stream_chat_forwards_fragments() {
        let (base, _rx) = spawn_server(
            200,
            "data: Hello\n\ndata: world\n\n",
            "text/event-stream",
        );
        let client = BackendClient::new(base, configured_credentials());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        client.stream_chat("Hello", tx).await.unwrap();

        let mut fragments = Vec::new();
        while let Ok(chunk) = rx.try_recv() {
            match chunk {
                StreamChunk::Text(text) => fragments.push(text),
                StreamChunk::Done => break,
                StreamChunk::Error(err) => panic!("unexpected stream error: {err}"),
            }
        }
        assert_eq!(fragments, vec!["Hello", "world"]);
    }
}
