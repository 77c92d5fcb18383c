use crate::client::{GenerationParams, endpoint};
use crate::error::{LlmError, Result};
use crate::provider::Provider;
use crate::types::{ChatMessage, ChatResponse, Role, Usage};
use serde::{Deserialize, Serialize};

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_MESSAGES_PATH: &str = "/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    params: GenerationParams,
}

impl AnthropicClient {
    pub fn new(
        http: reqwest::Client,
        base_url: Option<&str>,
        api_key: &str,
        model: &str,
        params: GenerationParams,
    ) -> Self {
        Self {
            http,
            url: endpoint(base_url, ANTHROPIC_API_BASE, ANTHROPIC_MESSAGES_PATH),
            api_key: api_key.to_string(),
            model: model.to_string(),
            params,
        }
    }

    #[tracing::instrument(level = "info", skip_all)]
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatResponse> {
        let req = AnthropicRequest::new(&self.model, messages, self.params);

        let response = self
            .http
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&req)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::Status {
                provider: Provider::Anthropic,
                status: status.as_u16(),
                body,
            });
        }

        let parsed: AnthropicResponse = serde_json::from_str(&body)?;
        Ok(parsed.into())
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "String::is_empty")]
    system: String,
    messages: Vec<AnthropicMessage>,
}

impl AnthropicRequest {
    fn new(model: &str, messages: &[ChatMessage], params: GenerationParams) -> Self {
        let mut system = String::new();
        let mut out_messages = Vec::new();

        // System turns are lifted into the top-level field; the API rejects them inline.
        for m in messages {
            match m.role {
                Role::System => {
                    if !system.is_empty() {
                        system.push('\n');
                    }
                    system.push_str(m.content.trim());
                }
                Role::User => out_messages.push(AnthropicMessage {
                    role: "user",
                    content: m.content.clone(),
                }),
                Role::Assistant => out_messages.push(AnthropicMessage {
                    role: "assistant",
                    content: m.content.clone(),
                }),
            }
        }

        Self {
            model: model.to_string(),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            system,
            messages: out_messages,
        }
    }
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: AnthropicUsage,
}

#[derive(Debug, Default, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

impl From<AnthropicResponse> for ChatResponse {
    fn from(v: AnthropicResponse) -> Self {
        let mut content = String::new();
        for block in v.content {
            if let AnthropicContentBlock::Text { text } = block {
                content.push_str(&text);
            }
        }

        ChatResponse {
            message: ChatMessage::assistant(content),
            usage: Usage {
                prompt_tokens: v.usage.input_tokens,
                completion_tokens: v.usage.output_tokens,
            },
            finish_reason: v.stop_reason.unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn system_messages_are_lifted_out_of_the_turn_list() {
        let req = AnthropicRequest::new(
            "claude-3-opus-20240229",
            &[
                ChatMessage::system("  rule one "),
                ChatMessage::system("rule two"),
                ChatMessage::user("hi"),
                ChatMessage::assistant("hello"),
            ],
            GenerationParams::default(),
        );
        assert_eq!(req.system, "rule one\nrule two");
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, "user");
        assert_eq!(req.messages[1].role, "assistant");
    }

    #[test]
    fn empty_system_prompt_is_omitted() {
        let req = AnthropicRequest::new("m", &[ChatMessage::user("hi")], GenerationParams::default());
        let v = serde_json::to_value(&req).expect("serializes");
        assert!(v.get("system").is_none());
        assert_eq!(v["max_tokens"], json!(1000));
    }

    #[test]
    fn response_concatenates_text_blocks_and_skips_others() {
        let parsed: AnthropicResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "Hello, "},
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "world"}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 4, "output_tokens": 2}
        }))
        .expect("parses");
        let resp = ChatResponse::from(parsed);
        assert_eq!(resp.message.content, "Hello, world");
        assert_eq!(resp.finish_reason, "end_turn");
        assert_eq!(resp.usage.completion_tokens, 2);
    }
}
