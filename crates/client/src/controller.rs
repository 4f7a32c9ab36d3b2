//! Orchestrating controller: one conversation per surface, a shared
//! credential store, and the backend client.
//!
//! The send path follows the message lifecycle: state transition + history
//! snapshot under the lock, dispatch with the lock released, resolution and
//! persistence back under the lock. Exactly one request per surface can be
//! in flight; a concurrent send is rejected before anything mutates.

use crate::conversation::{Conversation, SendError, Surface};
use parking_lot::Mutex;
use providers::backend::{BackendClient, Capability};
use shared::chat_api::Message;
use shared::credentials::CredentialStore;
use shared::storage::DurableStore;
use std::collections::HashMap;
use std::sync::Arc;

pub struct ChatController {
    credentials: Arc<CredentialStore>,
    backend: BackendClient,
    durable: Arc<dyn DurableStore>,
    conversations: Mutex<HashMap<Surface, Conversation>>,
}

impl ChatController {
    /// Builds the controller, restoring any persisted per-surface logs for
    /// display continuity. Unparsable logs are discarded.
    pub fn new(
        base_url: impl Into<String>,
        credentials: Arc<CredentialStore>,
        durable: Arc<dyn DurableStore>,
    ) -> Self {
        let user_name = credentials.get().map(|r| r.user_name);
        let mut conversations = HashMap::new();
        for surface in Surface::ALL {
            let restored = durable.get(surface.history_key()).and_then(|raw| {
                serde_json::from_str::<Vec<Message>>(&raw)
                    .map_err(|err| {
                        tracing::warn!(
                            surface = surface.as_str(),
                            "discarding unparsable conversation log: {err}"
                        );
                    })
                    .ok()
            });
            let convo = match restored {
                Some(messages) => {
                    Conversation::from_messages(surface, messages, user_name.as_deref())
                }
                None => Conversation::new(surface, user_name.as_deref()),
            };
            conversations.insert(surface, convo);
        }
        Self {
            backend: BackendClient::new(base_url, credentials.clone()),
            credentials,
            durable,
            conversations: Mutex::new(conversations),
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    pub fn messages(&self, surface: Surface) -> Vec<Message> {
        self.conversations
            .lock()
            .get(&surface)
            .map(|c| c.messages().to_vec())
            .unwrap_or_default()
    }

    pub fn is_awaiting(&self, surface: Surface) -> bool {
        self.conversations
            .lock()
            .get(&surface)
            .is_some_and(Conversation::is_awaiting)
    }

    /// Sends one turn on a chat-style surface. On the image surface this
    /// requests a single image; use [`send_images`](Self::send_images) for
    /// more.
    pub async fn send(&self, surface: Surface, text: &str) -> Result<(), SendError> {
        let capability = match surface {
            Surface::Chat => Capability::Chat,
            Surface::Cricket => Capability::Cricket,
            Surface::Image => Capability::Image { count: 1 },
        };
        self.dispatch(surface, capability, text).await
    }

    /// Image-generation turn with an explicit image count (min 1).
    pub async fn send_images(&self, text: &str, count: u32) -> Result<(), SendError> {
        self.dispatch(Surface::Image, Capability::Image { count }, text)
            .await
    }

    async fn dispatch(
        &self,
        surface: Surface,
        capability: Capability,
        text: &str,
    ) -> Result<(), SendError> {
        // Transition and snapshot under the lock; never hold it across await.
        let outbound = {
            let mut conversations = self.conversations.lock();
            let convo = conversations
                .get_mut(&surface)
                .expect("every surface is seeded at construction");
            convo.begin_send(text)?
        };
        tracing::debug!(surface = surface.as_str(), "turn started");

        let reply = self
            .backend
            .send_message(capability, &outbound.input_text, &outbound.history)
            .await;

        let mut conversations = self.conversations.lock();
        if let Some(convo) = conversations.get_mut(&surface) {
            convo.resolve(reply);
            self.persist(convo);
        }
        Ok(())
    }

    /// Clears one surface back to its cleared notice.
    pub fn clear(&self, surface: Surface) {
        let mut conversations = self.conversations.lock();
        if let Some(convo) = conversations.get_mut(&surface) {
            convo.clear();
            self.persist(convo);
        }
    }

    /// Signs the user out: credential gone, durable logs gone, every
    /// surface reseeded. The theme flag is left alone.
    pub fn sign_out(&self) {
        self.credentials.clear();
        let mut conversations = self.conversations.lock();
        for surface in Surface::ALL {
            self.durable.remove(surface.history_key());
            if let Some(convo) = conversations.get_mut(&surface) {
                convo.reset(None);
            }
        }
        tracing::info!("signed out");
    }

    fn persist(&self, convo: &Conversation) {
        match serde_json::to_string(convo.messages()) {
            Ok(raw) => self.durable.set(convo.surface().history_key(), &raw),
            Err(err) => tracing::warn!(
                surface = convo.surface().as_str(),
                "failed to serialize conversation log: {err}"
            ),
        }
    }
}
