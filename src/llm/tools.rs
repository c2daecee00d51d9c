use crate::errors::{DeskhandError, DeskhandResult};
use crate::llm::types::ToolDef;

/// Tool declarations exposed to the model, embedded at compile time.
pub fn load_builtin_tools() -> DeskhandResult<Vec<ToolDef>> {
    let json = include_str!("../../prompts/tools/builtin.json");
    serde_json::from_str(json)
        .map_err(|e| DeskhandError::Config(format!("failed to parse builtin tools: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tools_declare_both_executors() {
        let tools = load_builtin_tools().unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert!(names.contains(&"computer"));
        assert!(names.contains(&"str_replace_editor"));
        for tool in &tools {
            assert_eq!(tool.input_schema["type"], "object");
        }
    }
}
