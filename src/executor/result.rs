/// Outcome of a single tool invocation.
///
/// Constructed once per invocation, consumed when the engine formats the
/// next outbound message. Empty iff no field is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolResult {
    pub output: Option<String>,
    pub error: Option<String>,
    pub base64_image: Option<String>,
    /// Side-channel note for the model, transported outside the normal
    /// output text (wrapped in `<system>` tags by the engine).
    pub system: Option<String>,
}

impl ToolResult {
    pub fn is_empty(&self) -> bool {
        self.output.is_none()
            && self.error.is_none()
            && self.base64_image.is_none()
            && self.system.is_none()
    }

    pub fn with_output(self, output: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
            ..self
        }
    }

    pub fn with_error(self, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..self
        }
    }

    pub fn with_image(self, base64_image: impl Into<String>) -> Self {
        Self {
            base64_image: Some(base64_image.into()),
            ..self
        }
    }

    pub fn with_system(self, system: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_until_any_field_is_set() {
        assert!(ToolResult::default().is_empty());
        assert!(!ToolResult::default().with_output("ok").is_empty());
        assert!(!ToolResult::default().with_error("bad").is_empty());
        assert!(!ToolResult::default().with_image("aGk=").is_empty());
        assert!(!ToolResult::default().with_system("note").is_empty());
    }

    #[test]
    fn replacement_leaves_other_fields_untouched() {
        let r = ToolResult::default()
            .with_output("first")
            .with_system("note")
            .with_output("second");
        assert_eq!(r.output.as_deref(), Some("second"));
        assert_eq!(r.system.as_deref(), Some("note"));
        assert!(r.error.is_none());
        assert!(r.base64_image.is_none());
    }
}
