use crate::client::{GenerationParams, endpoint};
use crate::error::{LlmError, Result};
use crate::provider::Provider;
use crate::types::{ChatMessage, ChatResponse, Role, Usage};
use serde::{Deserialize, Serialize};

const COHERE_API_BASE: &str = "https://api.cohere.com";
const COHERE_CHAT_PATH: &str = "/v2/chat";

#[derive(Clone)]
pub struct CohereClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    params: GenerationParams,
}

impl CohereClient {
    pub fn new(
        http: reqwest::Client,
        base_url: Option<&str>,
        api_key: &str,
        model: &str,
        params: GenerationParams,
    ) -> Self {
        Self {
            http,
            url: endpoint(base_url, COHERE_API_BASE, COHERE_CHAT_PATH),
            api_key: api_key.to_string(),
            model: model.to_string(),
            params,
        }
    }

    #[tracing::instrument(level = "info", skip_all)]
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatResponse> {
        let req = CohereChatRequest::new(&self.model, messages, self.params);

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::Status {
                provider: Provider::Cohere,
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CohereChatResponse = serde_json::from_str(&body)?;
        parsed.try_into()
    }
}

#[derive(Debug, Serialize)]
struct CohereChatRequest {
    model: String,
    messages: Vec<CohereMessage>,
    temperature: f32,
    max_tokens: u32,
}

impl CohereChatRequest {
    fn new(model: &str, messages: &[ChatMessage], params: GenerationParams) -> Self {
        Self {
            model: model.to_string(),
            messages: messages
                .iter()
                .map(|m| CohereMessage {
                    role: match m.role {
                        Role::System => "system",
                        Role::User => "user",
                        Role::Assistant => "assistant",
                    },
                    content: m.content.clone(),
                })
                .collect(),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
struct CohereMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CohereChatResponse {
    message: Option<CohereResponseMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    usage: Option<CohereUsage>,
}

#[derive(Debug, Deserialize)]
struct CohereResponseMessage {
    #[serde(default)]
    content: Vec<CohereContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CohereContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct CohereUsage {
    #[serde(default)]
    tokens: Option<CohereTokenCounts>,
    #[serde(default)]
    billed_units: Option<CohereTokenCounts>,
}

// Cohere reports counts as JSON numbers that may carry a fractional part.
#[derive(Debug, Default, Deserialize)]
struct CohereTokenCounts {
    #[serde(default)]
    input_tokens: f64,
    #[serde(default)]
    output_tokens: f64,
}

impl TryFrom<CohereChatResponse> for ChatResponse {
    type Error = LlmError;

    fn try_from(v: CohereChatResponse) -> Result<Self> {
        let message = v.message.ok_or_else(|| {
            LlmError::ResponseFormat("cohere response missing message".to_string())
        })?;

        let mut content = String::new();
        for block in message.content {
            if let CohereContentBlock::Text { text } = block {
                content.push_str(&text);
            }
        }

        let counts = v
            .usage
            .and_then(|u| u.tokens.or(u.billed_units))
            .unwrap_or_default();

        Ok(ChatResponse {
            message: ChatMessage::assistant(content),
            usage: Usage {
                prompt_tokens: counts.input_tokens as u32,
                completion_tokens: counts.output_tokens as u32,
            },
            finish_reason: v.finish_reason.unwrap_or_else(|| "unknown".to_string()),
        })
    }
}
