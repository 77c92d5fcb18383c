//! The active provider session and the running conversation.

use async_trait::async_trait;
use sb_llm::{ChatMessage, ChatResponse, LlmClient, Provider, Role};

pub const SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant. Continue the conversation in a helpful and professional manner.";

/// Anything that can answer a conversation turn.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn model(&self) -> &str;

    async fn reply(&self, messages: &[ChatMessage]) -> sb_llm::Result<ChatResponse>;
}

#[async_trait]
impl ChatBackend for LlmClient {
    fn model(&self) -> &str {
        LlmClient::model(self)
    }

    async fn reply(&self, messages: &[ChatMessage]) -> sb_llm::Result<ChatResponse> {
        self.chat(messages).await
    }
}

/// The one live client. Replaced whole on switch; call [`ActiveSession::release`]
/// before dropping it.
pub struct ActiveSession<C> {
    provider: Provider,
    client: C,
}

impl<C: ChatBackend> ActiveSession<C> {
    pub fn new(provider: Provider, client: C) -> Self {
        tracing::info!(provider = %provider, model = %client.model(), "session started");
        Self { provider, client }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn release(self) {
        tracing::debug!(provider = %self.provider, "releasing session client");
        drop(self.client);
    }
}

/// Turn history. Survives provider switches.
#[derive(Debug, Clone)]
pub struct Conversation {
    history: Vec<ChatMessage>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            history: vec![ChatMessage::system(SYSTEM_PROMPT)],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn push_user(&mut self, content: &str) {
        self.history.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: &str) {
        self.history.push(ChatMessage::assistant(content));
    }

    /// Drop a trailing user turn that never got an answer.
    pub fn discard_unanswered(&mut self) {
        if self.history.last().is_some_and(|m| m.role == Role::User) {
            self.history.pop();
        }
    }

    /// Completed user/assistant exchanges.
    pub fn exchanges(&self) -> usize {
        self.history
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .count()
    }
}
