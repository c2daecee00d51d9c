use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeskhandError {
    /// Domain-level tool failure: invalid input, missing field, range or
    /// uniqueness violation, pre-existing file conflict. Surfaced to the
    /// model as an error-flagged tool result, never fatal.
    #[error("{0}")]
    Tool(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM provider error: {0}")]
    LlmProvider(String),

    #[error("Screen capture error: {0}")]
    Capture(String),

    #[error("Input injection error: {0}")]
    Input(String),

    #[error("Tracker error: {0}")]
    Tracker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

impl DeskhandError {
    pub fn tool(msg: impl Into<String>) -> Self {
        Self::Tool(msg.into())
    }

    /// Collapse any variant into the domain `Tool` kind. Executors call
    /// this at their boundary so callers see one uniform error type.
    pub fn into_tool(self) -> Self {
        match self {
            Self::Tool(_) => self,
            other => Self::Tool(other.to_string()),
        }
    }
}

pub type DeskhandResult<T> = Result<T, DeskhandError>;
