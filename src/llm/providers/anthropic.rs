use async_trait::async_trait;

use crate::config::ApiConfig;
use crate::errors::{DeskhandError, DeskhandResult};
use crate::llm::provider::LlmProvider;
use crate::llm::types::{ApiResponse, ContentBlock, Message, ToolDef};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Messages-API provider. The remote service is an opaque collaborator:
/// one POST per turn, no timeout beyond reqwest defaults, no retries.
pub struct AnthropicProvider {
    api_base: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_base: String, api_key: String, model: String, max_tokens: u32) -> Self {
        Self {
            api_base,
            api_key,
            model,
            max_tokens,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &ApiConfig) -> DeskhandResult<Self> {
        let api_key = config.resolve_api_key()?;
        Ok(Self::new(
            config.api_base.clone(),
            api_key,
            config.model.clone(),
            config.max_tokens,
        ))
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn chat(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[ToolDef],
    ) -> DeskhandResult<ApiResponse> {
        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": system,
            "messages": messages,
        });
        if !tools.is_empty() {
            body["tools"] = serde_json::to_value(tools)?;
        }

        tracing::debug!(
            model = %self.model,
            messages = messages.len(),
            images = count_images(messages),
            "sending model request"
        );

        let url = format!("{}/v1/messages", self.api_base.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(DeskhandError::LlmProvider(format!("{status}: {err_body}")));
        }

        let parsed: ApiResponse = response.json().await?;
        let tool_uses = parsed
            .content
            .iter()
            .filter(|b| matches!(b, ContentBlock::ToolUse { .. }))
            .count();
        tracing::info!(
            stop_reason = parsed.stop_reason.as_deref().unwrap_or(""),
            blocks = parsed.content.len(),
            tool_uses,
            output_tokens = parsed.usage.as_ref().map(|u| u.output_tokens).unwrap_or(0),
            "model response received"
        );
        Ok(parsed)
    }
}

/// Image payloads are large; logging only counts them.
fn count_images(messages: &[Message]) -> usize {
    messages
        .iter()
        .flat_map(|m| &m.content)
        .filter(|b| {
            matches!(b, ContentBlock::Image { .. })
                || matches!(
                    b,
                    ContentBlock::ToolResult { content, .. }
                        if content.iter().any(|c| matches!(c, ContentBlock::Image { .. }))
                )
        })
        .count()
}
