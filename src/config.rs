use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{DeskhandError, DeskhandResult};
use crate::perception::scaling::Resolution;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub screen: ScreenConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Optional API key stored in config.toml (falls back to the
    /// ANTHROPIC_API_KEY environment variable).
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_key: None,
        }
    }
}

impl ApiConfig {
    /// Resolve the credential: config value first, then environment.
    pub fn resolve_api_key(&self) -> DeskhandResult<String> {
        if let Some(key) = self.api_key.as_deref() {
            if !key.is_empty() {
                return Ok(key.to_string());
            }
        }
        std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            DeskhandError::Config(
                "no API key: set api.api_key in config.toml or export ANTHROPIC_API_KEY".into(),
            )
        })
    }
}

fn default_api_base() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

/// The fixed coordinate space the model reasons in, independent of the
/// actual display size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenConfig {
    #[serde(default = "default_virtual_width")]
    pub virtual_width: u32,
    #[serde(default = "default_virtual_height")]
    pub virtual_height: u32,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            virtual_width: default_virtual_width(),
            virtual_height: default_virtual_height(),
        }
    }
}

impl ScreenConfig {
    pub fn virtual_resolution(&self) -> Resolution {
        Resolution::new(self.virtual_width, self.virtual_height)
    }
}

fn default_virtual_width() -> u32 {
    1280
}

fn default_virtual_height() -> u32 {
    800
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Milliseconds slept before every injected action, leaving a window
    /// for the human to interrupt.
    #[serde(default = "default_action_delay_ms")]
    pub action_delay_ms: u64,
    /// Milliseconds slept after an action before the follow-up capture.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Milliseconds slept between sequential tool executions in one turn.
    #[serde(default = "default_tool_pause_ms")]
    pub tool_pause_ms: u64,
    /// Environment-specific note appended to the system prompt, e.g. the
    /// location of an application window on this machine.
    #[serde(default)]
    pub environment_note: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            action_delay_ms: default_action_delay_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            tool_pause_ms: default_tool_pause_ms(),
            environment_note: String::new(),
        }
    }
}

fn default_action_delay_ms() -> u64 {
    500
}

fn default_settle_delay_ms() -> u64 {
    300
}

fn default_tool_pause_ms() -> u64 {
    500
}

fn resolve_config_path() -> DeskhandResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    Err(DeskhandError::Config(
        "config.toml not found next to executable or in working directory".into(),
    ))
}

pub fn load_config() -> DeskhandResult<AppConfig> {
    let path = resolve_config_path()?;
    let content = std::fs::read_to_string(&path)?;
    let config: AppConfig = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), model = %config.api.model, "config loaded");
    Ok(config)
}

/// Load config.toml if present, otherwise fall back to built-in defaults.
pub fn load_config_or_default() -> AppConfig {
    match load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!(error = %e, "using default configuration");
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_sections() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.screen.virtual_width, 1280);
        assert_eq!(cfg.screen.virtual_height, 800);
        assert_eq!(cfg.api.max_tokens, 4096);
        assert!(cfg.agent.environment_note.is_empty());
    }

    #[test]
    fn partial_toml_overrides_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [screen]
            virtual_width = 1920
            virtual_height = 1080

            [agent]
            environment_note = "Firefox is maximized on the left monitor."
            "#,
        )
        .unwrap();
        assert_eq!(cfg.screen.virtual_resolution(), Resolution::new(1920, 1080));
        assert_eq!(cfg.agent.action_delay_ms, 500);
        assert!(!cfg.agent.environment_note.is_empty());
    }
}
