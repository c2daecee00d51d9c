use async_trait::async_trait;

use crate::errors::DeskhandResult;
use crate::llm::types::{ApiResponse, Message, ToolDef};

/// Unified remote-model interface: one full conversation in, one
/// complete response out. No streaming, no retry policy.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn chat(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[ToolDef],
    ) -> DeskhandResult<ApiResponse>;
}
