use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One conversation turn. The conversation is append-only for the
/// lifetime of the session and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    pub fn user_blocks(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        source: ImageSource,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: Vec<ContentBlock>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub media_type: String,
    pub data: String,
}

impl ImageSource {
    pub fn png_base64(data: impl Into<String>) -> Self {
        Self {
            source_type: "base64".into(),
            media_type: "image/png".into(),
            data: data.into(),
        }
    }
}

/// Tool declaration sent to the model alongside the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

impl ApiResponse {
    /// Concatenated text blocks of the response.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_with_text_and_tool_use_parses() {
        let raw = json!({
            "id": "msg_01",
            "model": "claude-3-5-sonnet-20241022",
            "content": [
                {"type": "text", "text": "Taking a screenshot first."},
                {"type": "tool_use", "id": "toolu_01", "name": "computer",
                 "input": {"action": "screenshot"}},
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 12, "output_tokens": 34},
        });
        let resp: ApiResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(resp.text(), "Taking a screenshot first.");
        assert_eq!(resp.stop_reason.as_deref(), Some("tool_use"));
        match &resp.content[1] {
            ContentBlock::ToolUse { name, input, .. } => {
                assert_eq!(name, "computer");
                assert_eq!(input["action"], "screenshot");
            }
            other => panic!("parsed as {other:?}"),
        }
    }

    #[test]
    fn tool_result_omits_is_error_when_unset() {
        let ok = ContentBlock::ToolResult {
            tool_use_id: "toolu_01".into(),
            content: vec![ContentBlock::Text { text: "done".into() }],
            is_error: false,
        };
        let v = serde_json::to_value(&ok).unwrap();
        assert!(v.get("is_error").is_none());

        let failed = ContentBlock::ToolResult {
            tool_use_id: "toolu_01".into(),
            content: vec![],
            is_error: true,
        };
        let v = serde_json::to_value(&failed).unwrap();
        assert_eq!(v["is_error"], json!(true));
    }

    #[test]
    fn image_block_carries_base64_source() {
        let block = ContentBlock::Image {
            source: ImageSource::png_base64("aGVsbG8="),
        };
        let v = serde_json::to_value(&block).unwrap();
        assert_eq!(v["type"], "image");
        assert_eq!(v["source"]["type"], "base64");
        assert_eq!(v["source"]["media_type"], "image/png");
    }
}
