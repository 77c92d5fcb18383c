use crate::anthropic::AnthropicClient;
use crate::cohere::CohereClient;
use crate::error::{LlmError, Result};
use crate::openai::OpenAiClient;
use crate::provider::Provider;
use crate::types::{ChatMessage, ChatResponse};

/// Body of the single request used to confirm a credential is accepted.
pub const PROBE_PROMPT: &str = "Test connection";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1000,
        }
    }
}

#[derive(Clone)]
pub struct LlmClient {
    provider: Provider,
    api_key: String,
    model: String,
    params: GenerationParams,
    base_url: Option<String>,
    client: reqwest::Client,
}

impl LlmClient {
    #[tracing::instrument(level = "debug", skip_all, fields(provider = %provider, model = %model))]
    pub fn new(provider: Provider, api_key: &str, model: &str, params: GenerationParams) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(%e, "reqwest client build failed; falling back to default client");
                reqwest::Client::new()
            });
        Self {
            provider,
            api_key: api_key.to_string(),
            model: model.to_string(),
            params,
            base_url: None,
            client,
        }
    }

    /// Point the client at another origin (scheme + host), keeping the vendor path.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn params(&self) -> GenerationParams {
        self.params
    }

    #[tracing::instrument(
        level = "info",
        skip_all,
        fields(provider = %self.provider, model = %self.model, messages = messages.len())
    )]
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatResponse> {
        if messages.is_empty() {
            return Err(LlmError::InvalidInput(
                "chat requires at least one message".to_string(),
            ));
        }
        match self.provider {
            Provider::OpenAi => {
                let c = OpenAiClient::new(
                    self.client.clone(),
                    self.base_url.as_deref(),
                    &self.api_key,
                    &self.model,
                    self.params,
                );
                c.chat(messages).await
            }
            Provider::Anthropic => {
                let c = AnthropicClient::new(
                    self.client.clone(),
                    self.base_url.as_deref(),
                    &self.api_key,
                    &self.model,
                    self.params,
                );
                c.chat(messages).await
            }
            Provider::Cohere => {
                let c = CohereClient::new(
                    self.client.clone(),
                    self.base_url.as_deref(),
                    &self.api_key,
                    &self.model,
                    self.params,
                );
                c.chat(messages).await
            }
        }
    }

    /// One minimal request; the reply text is discarded.
    #[tracing::instrument(level = "debug", skip_all, fields(provider = %self.provider))]
    pub async fn probe(&self) -> Result<()> {
        let resp = self.chat(&[ChatMessage::user(PROBE_PROMPT)]).await?;
        tracing::debug!(
            finish_reason = %resp.finish_reason,
            prompt_tokens = resp.usage.prompt_tokens,
            completion_tokens = resp.usage.completion_tokens,
            "probe accepted"
        );
        Ok(())
    }
}

pub(crate) fn endpoint(base_url: Option<&str>, default_base: &str, path: &str) -> String {
    let base = base_url.unwrap_or(default_base).trim_end_matches('/');
    format!("{base}{path}")
}
