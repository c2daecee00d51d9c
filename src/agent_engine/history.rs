use std::io::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::DeskhandResult;

/// One transcript line: either spoken content or a tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub ts: i64,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<serde_json::Value>,
}

/// Append-only JSONL transcript of one session, written under the
/// platform data directory. Never read back by the program; the
/// in-memory conversation is the only live state.
pub struct SessionHistory {
    pub session_id: String,
    file_path: PathBuf,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::in_dir(data_dir_or_cwd())
    }

    pub fn in_dir(dir: PathBuf) -> Self {
        let session_id = uuid::Uuid::new_v4().to_string();
        let file_path = dir.join(format!("session_{session_id}.jsonl"));
        Self {
            session_id,
            file_path,
        }
    }

    /// Append one entry; transcript failures are logged, never fatal.
    pub fn record(&self, role: &str, content: Option<&str>, tool: Option<serde_json::Value>) {
        let entry = HistoryEntry {
            ts: chrono::Utc::now().timestamp_millis(),
            role: role.to_string(),
            content: content.map(str::to_string),
            tool,
        };
        if let Err(e) = self.append(&entry) {
            tracing::warn!(error = %e, path = %self.file_path.display(), "transcript write failed");
        }
    }

    fn append(&self, entry: &HistoryEntry) -> DeskhandResult<()> {
        let line = serde_json::to_string(entry)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::new()
    }
}

fn data_dir_or_cwd() -> PathBuf {
    if let Some(base) = dirs::data_local_dir() {
        let dir = base.join("deskhand").join("sessions");
        if std::fs::create_dir_all(&dir).is_ok() {
            return dir;
        }
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_appended_as_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let history = SessionHistory::in_dir(dir.path().to_path_buf());
        history.record("user", Some("open the browser"), None);
        history.record(
            "tool",
            None,
            Some(serde_json::json!({"name": "computer", "input": {"action": "screenshot"}})),
        );

        let path = dir
            .path()
            .join(format!("session_{}.jsonl", history.session_id));
        let raw = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: HistoryEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.role, "user");
        assert_eq!(first.content.as_deref(), Some("open the browser"));
    }
}
