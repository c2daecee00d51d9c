use serde_json::Value;

use crate::config::AppConfig;
use crate::errors::{DeskhandError, DeskhandResult};
use crate::executor::computer::{ComputerArgs, ComputerTool};
use crate::executor::editor::{EditorCommand, EditorTool};
use crate::executor::result::ToolResult;

pub const COMPUTER_TOOL: &str = "computer";
pub const EDITOR_TOOL: &str = "str_replace_editor";

/// A tool request from the model, parsed into its typed form before any
/// execution happens.
#[derive(Debug, Clone)]
pub enum ToolInvocation {
    Computer(ComputerArgs),
    Editor(EditorCommand),
}

impl ToolInvocation {
    pub fn parse(name: &str, input: Value) -> DeskhandResult<Self> {
        match name {
            COMPUTER_TOOL => serde_json::from_value(input)
                .map(Self::Computer)
                .map_err(|e| DeskhandError::tool(format!("invalid `{COMPUTER_TOOL}` input: {e}"))),
            EDITOR_TOOL => serde_json::from_value(input)
                .map(Self::Editor)
                .map_err(|e| DeskhandError::tool(format!("invalid `{EDITOR_TOOL}` input: {e}"))),
            other => Err(DeskhandError::tool(format!("unknown tool: {other}"))),
        }
    }
}

/// Owns the two local executors and routes invocations to them.
pub struct Dispatcher {
    computer: ComputerTool,
    editor: EditorTool,
}

impl Dispatcher {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            computer: ComputerTool::new(config),
            editor: EditorTool::new(),
        }
    }

    pub async fn dispatch(&mut self, invocation: ToolInvocation) -> DeskhandResult<ToolResult> {
        match invocation {
            ToolInvocation::Computer(args) => self.computer.run(args).await,
            ToolInvocation::Editor(command) => self.editor.run(command).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_tool_is_a_domain_error() {
        let err = ToolInvocation::parse("browser", json!({})).unwrap_err();
        assert!(matches!(err, DeskhandError::Tool(_)));
        assert!(err.to_string().contains("unknown tool"));
    }

    #[test]
    fn editor_command_parses_from_tagged_input() {
        let inv = ToolInvocation::parse(
            EDITOR_TOOL,
            json!({"command": "view", "path": "/etc/hosts", "view_range": [1, 5]}),
        )
        .unwrap();
        match inv {
            ToolInvocation::Editor(EditorCommand::View { path, view_range }) => {
                assert_eq!(path, std::path::PathBuf::from("/etc/hosts"));
                assert_eq!(view_range, Some(vec![1, 5]));
            }
            other => panic!("parsed as {other:?}"),
        }
    }

    #[test]
    fn malformed_computer_input_reports_the_tool() {
        let err = ToolInvocation::parse(COMPUTER_TOOL, json!({"action": "warp"})).unwrap_err();
        assert!(err.to_string().contains(COMPUTER_TOOL));
    }
}
