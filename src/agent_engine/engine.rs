use std::sync::Arc;
use std::time::Duration;

use crate::agent_engine::history::SessionHistory;
use crate::config::AppConfig;
use crate::errors::DeskhandResult;
use crate::executor::dispatcher::{Dispatcher, ToolInvocation};
use crate::executor::result::ToolResult;
use crate::llm::provider::LlmProvider;
use crate::llm::tools::load_builtin_tools;
use crate::llm::types::{ContentBlock, ImageSource, Message, ToolDef};

const SYSTEM_PROMPT: &str = "\
You are operating a computer through two tools: `computer` drives the mouse, \
keyboard and screen; `str_replace_editor` views and edits files.

Rules:
- Take a screenshot first to see the current screen state before acting.
- The screen is {width}x{height}; screenshots you receive use the same coordinates.
- After a click or keystroke, check the returned screenshot to confirm the \
effect before moving on.
- Prefer keyboard shortcuts over clicking through menus when both work.
- When the task is complete, reply with a short summary and stop calling tools.";

/// Orchestrates the conversation with the model and the two local
/// executors. One engine per interactive session; the conversation is
/// held in memory only.
pub struct AgentEngine {
    provider: Arc<dyn LlmProvider>,
    dispatcher: Dispatcher,
    tools: Vec<ToolDef>,
    system_prompt: String,
    messages: Vec<Message>,
    history: SessionHistory,
    tool_pause: Duration,
}

impl AgentEngine {
    pub fn new(config: &AppConfig, provider: Arc<dyn LlmProvider>) -> DeskhandResult<Self> {
        let tools = load_builtin_tools()?;
        let virtual_res = config.screen.virtual_resolution();
        let mut system_prompt = SYSTEM_PROMPT
            .replace("{width}", &virtual_res.width.to_string())
            .replace("{height}", &virtual_res.height.to_string());
        if !config.agent.environment_note.is_empty() {
            system_prompt.push_str("\n\nEnvironment:\n");
            system_prompt.push_str(&config.agent.environment_note);
        }
        Ok(Self {
            provider,
            dispatcher: Dispatcher::new(config),
            tools,
            system_prompt,
            messages: Vec::new(),
            history: SessionHistory::new(),
            tool_pause: Duration::from_millis(config.agent.tool_pause_ms),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.history.session_id
    }

    /// Run one user instruction to completion: model turns alternate
    /// with sequential tool execution until the model stops requesting
    /// tools. Returns the model's final text.
    pub async fn run_instruction(&mut self, instruction: &str) -> DeskhandResult<String> {
        self.messages.push(Message::user_text(instruction));
        self.history.record("user", Some(instruction), None);

        loop {
            let response = self
                .provider
                .chat(&self.system_prompt, &self.messages, &self.tools)
                .await?;

            let text = response.text();
            if !text.is_empty() {
                tracing::info!(text = %text, "assistant");
                self.history.record("assistant", Some(&text), None);
            }

            let tool_uses: Vec<(String, String, serde_json::Value)> = response
                .content
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::ToolUse { id, name, input } => {
                        Some((id.clone(), name.clone(), input.clone()))
                    }
                    _ => None,
                })
                .collect();

            self.messages.push(Message::assistant(response.content));

            if tool_uses.is_empty() {
                tracing::info!("no further tool requests, turn complete");
                return Ok(text);
            }

            let mut result_blocks = Vec::with_capacity(tool_uses.len());
            for (i, (id, name, input)) in tool_uses.into_iter().enumerate() {
                if i > 0 && !self.tool_pause.is_zero() {
                    tokio::time::sleep(self.tool_pause).await;
                }
                let result = self.execute(&name, input).await;
                result_blocks.push(tool_result_block(id, result));
            }
            self.messages.push(Message::user_blocks(result_blocks));
        }
    }

    /// Execute one invocation; every failure (malformed input, domain
    /// violation, automation fault) becomes an error-flagged result
    /// scoped to this call only.
    async fn execute(&mut self, name: &str, input: serde_json::Value) -> ToolResult {
        self.history.record(
            "tool",
            None,
            Some(serde_json::json!({"name": name, "input": input})),
        );

        let outcome = match ToolInvocation::parse(name, input) {
            Ok(invocation) => self.dispatcher.dispatch(invocation).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => {
                tracing::info!(
                    tool = name,
                    has_output = result.output.is_some(),
                    has_image = result.base64_image.is_some(),
                    "tool executed"
                );
                result
            }
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "tool failed");
                ToolResult::default().with_error(e.to_string())
            }
        }
    }
}

/// Format a result into a transport-ready `tool_result` block: text
/// with the optional system note in `<system>` tags, then the image.
fn tool_result_block(tool_use_id: String, result: ToolResult) -> ContentBlock {
    let is_error = result.error.is_some();

    let mut text = result.error.or(result.output).unwrap_or_default();
    if let Some(system) = result.system {
        text = format!("<system>{system}</system>\n{text}");
    }

    let mut content = Vec::new();
    if !text.is_empty() {
        content.push(ContentBlock::Text { text });
    }
    if let Some(data) = result.base64_image {
        content.push(ContentBlock::Image {
            source: ImageSource::png_base64(data),
        });
    }

    ContentBlock::ToolResult {
        tool_use_id,
        content,
        is_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DeskhandResult;
    use crate::llm::types::ApiResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[test]
    fn error_results_are_flagged() {
        let block = tool_result_block(
            "toolu_01".into(),
            ToolResult::default().with_error("no such file"),
        );
        match block {
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => {
                assert_eq!(tool_use_id, "toolu_01");
                assert!(is_error);
                assert!(matches!(
                    &content[0],
                    ContentBlock::Text { text } if text == "no such file"
                ));
            }
            other => panic!("formatted as {other:?}"),
        }
    }

    #[test]
    fn system_note_is_wrapped_and_image_appended() {
        let block = tool_result_block(
            "toolu_02".into(),
            ToolResult::default()
                .with_output("done")
                .with_system("screen may still be settling")
                .with_image("aGVsbG8="),
        );
        let ContentBlock::ToolResult {
            content, is_error, ..
        } = block
        else {
            panic!("not a tool_result");
        };
        assert!(!is_error);
        assert_eq!(content.len(), 2);
        assert!(matches!(
            &content[0],
            ContentBlock::Text { text }
                if text.starts_with("<system>screen may still be settling</system>")
                    && text.ends_with("done")
        ));
        assert!(matches!(&content[1], ContentBlock::Image { .. }));
    }

    #[test]
    fn empty_result_yields_empty_content() {
        let block = tool_result_block("toolu_03".into(), ToolResult::default());
        let ContentBlock::ToolResult { content, .. } = block else {
            panic!("not a tool_result");
        };
        assert!(content.is_empty());
    }

    /// Plays back scripted responses; records nothing.
    struct ScriptedProvider {
        responses: Mutex<Vec<ApiResponse>>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn chat(
            &self,
            _system: &str,
            _messages: &[Message],
            _tools: &[ToolDef],
        ) -> DeskhandResult<ApiResponse> {
            Ok(self.responses.lock().unwrap().remove(0))
        }
    }

    #[tokio::test]
    async fn editor_round_trip_through_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("hello.txt");

        let first = ApiResponse {
            content: vec![
                ContentBlock::Text {
                    text: "Creating the file.".into(),
                },
                ContentBlock::ToolUse {
                    id: "toolu_01".into(),
                    name: "str_replace_editor".into(),
                    input: serde_json::json!({
                        "command": "create",
                        "path": target.to_string_lossy(),
                        "file_text": "hello world\n",
                    }),
                },
            ],
            stop_reason: Some("tool_use".into()),
            usage: None,
        };
        let second = ApiResponse {
            content: vec![ContentBlock::Text {
                text: "Done.".into(),
            }],
            stop_reason: Some("end_turn".into()),
            usage: None,
        };

        let provider = Arc::new(ScriptedProvider {
            responses: Mutex::new(vec![first, second]),
        });
        let mut engine = AgentEngine::new(&AppConfig::default(), provider).unwrap();
        engine.history = SessionHistory::in_dir(dir.path().to_path_buf());

        let answer = engine.run_instruction("make hello.txt").await.unwrap();
        assert_eq!(answer, "Done.");
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "hello world\n");

        // user, assistant, tool_result user, final assistant.
        assert_eq!(engine.messages.len(), 4);
        let ContentBlock::ToolResult { is_error, .. } = &engine.messages[2].content[0] else {
            panic!("third message should carry the tool result");
        };
        assert!(!is_error);
    }
}
