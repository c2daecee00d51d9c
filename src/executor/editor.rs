use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{DeskhandError, DeskhandResult};
use crate::executor::result::ToolResult;

const SNIPPET_CONTEXT_LINES: usize = 4;
const MAX_OUTPUT_CHARS: usize = 16_000;
const TRUNCATED_NOTE: &str =
    "\n<output clipped; use `view` with a line range to read the rest of the file>";

/// File-editor commands as declared to the model. The `command` field of
/// the tool input selects the variant.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum EditorCommand {
    View {
        path: PathBuf,
        #[serde(default)]
        view_range: Option<Vec<i64>>,
    },
    Create {
        path: PathBuf,
        file_text: String,
    },
    StrReplace {
        path: PathBuf,
        old_str: String,
        #[serde(default)]
        new_str: Option<String>,
    },
    Insert {
        path: PathBuf,
        insert_line: usize,
        new_text: String,
    },
}

impl EditorCommand {
    fn path(&self) -> &Path {
        match self {
            Self::View { path, .. }
            | Self::Create { path, .. }
            | Self::StrReplace { path, .. }
            | Self::Insert { path, .. } => path,
        }
    }
}

/// Local file editor. Mutating commands record the prior file content in
/// an in-memory per-path history; the trail is kept for the lifetime of
/// the process and never consumed by an executable undo.
#[derive(Debug, Default)]
pub struct EditorTool {
    history: HashMap<PathBuf, Vec<String>>,
}

impl EditorTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded prior contents for `path`, oldest first.
    pub fn history(&self, path: &Path) -> Option<&[String]> {
        self.history.get(path).map(|v| v.as_slice())
    }

    pub async fn run(&mut self, command: EditorCommand) -> DeskhandResult<ToolResult> {
        self.validate_path(&command)?;
        match command {
            EditorCommand::View { path, view_range } => self.view(&path, view_range).await,
            EditorCommand::Create { path, file_text } => self.create(&path, file_text).await,
            EditorCommand::StrReplace {
                path,
                old_str,
                new_str,
            } => {
                self.str_replace(&path, &old_str, new_str.as_deref().unwrap_or(""))
                    .await
            }
            EditorCommand::Insert {
                path,
                insert_line,
                new_text,
            } => self.insert(&path, insert_line, &new_text).await,
        }
    }

    fn validate_path(&self, command: &EditorCommand) -> DeskhandResult<()> {
        let path = command.path();
        if !path.is_absolute() {
            let suggested = Path::new("/").join(path);
            return Err(DeskhandError::tool(format!(
                "The path {} is not an absolute path, it should start with '/'. Maybe you meant {}?",
                path.display(),
                suggested.display(),
            )));
        }
        if matches!(command, EditorCommand::Create { .. }) {
            if path.exists() {
                return Err(DeskhandError::tool(format!(
                    "File already exists at: {}. Cannot overwrite files using command `create`.",
                    path.display(),
                )));
            }
            return Ok(());
        }
        if !path.exists() {
            return Err(DeskhandError::tool(format!(
                "The path {} does not exist. Please provide a valid path.",
                path.display(),
            )));
        }
        if path.is_dir() && !matches!(command, EditorCommand::View { .. }) {
            return Err(DeskhandError::tool(format!(
                "The path {} is a directory; only the `view` command can be used on directories.",
                path.display(),
            )));
        }
        Ok(())
    }

    async fn view(&self, path: &Path, view_range: Option<Vec<i64>>) -> DeskhandResult<ToolResult> {
        if path.is_dir() {
            if view_range.is_some() {
                return Err(DeskhandError::tool(
                    "The `view_range` parameter is not allowed when `path` points to a directory.",
                ));
            }
            let listing = list_directory(path)?;
            return Ok(ToolResult::default().with_output(format!(
                "Files and directories up to 2 levels deep in {}, excluding hidden items:\n{listing}",
                path.display(),
            )));
        }

        let content = self.read_file(path).await?;
        let Some(range) = view_range else {
            return Ok(ToolResult::default().with_output(numbered(path, &content, 1)));
        };

        let lines: Vec<&str> = content.split('\n').collect();
        let n = lines.len() as i64;
        let &[start, end] = &range[..] else {
            return Err(DeskhandError::tool(
                "Invalid `view_range`. It should be a list of two integers.",
            ));
        };
        if start < 1 || start > n {
            return Err(DeskhandError::tool(format!(
                "Invalid `view_range`: [{start}, {end}]. Its first element `{start}` should be \
                 within the range of lines of the file: [1, {n}].",
            )));
        }
        if end != -1 && end < start {
            return Err(DeskhandError::tool(format!(
                "Invalid `view_range`: [{start}, {end}]. Its second element `{end}` should be \
                 larger or equal than its first element `{start}`.",
            )));
        }
        if end > n {
            return Err(DeskhandError::tool(format!(
                "Invalid `view_range`: [{start}, {end}]. Its second element `{end}` should be \
                 smaller than the number of lines in the file: `{n}`.",
            )));
        }

        let slice = if end == -1 {
            lines[(start - 1) as usize..].join("\n")
        } else {
            lines[(start - 1) as usize..end as usize].join("\n")
        };
        Ok(ToolResult::default().with_output(numbered(path, &slice, start as usize)))
    }

    async fn create(&mut self, path: &Path, file_text: String) -> DeskhandResult<ToolResult> {
        self.write_file(path, &file_text).await?;
        self.history
            .entry(path.to_path_buf())
            .or_default()
            .push(file_text);
        Ok(ToolResult::default()
            .with_output(format!("File created successfully at: {}", path.display())))
    }

    async fn str_replace(
        &mut self,
        path: &Path,
        old_str: &str,
        new_str: &str,
    ) -> DeskhandResult<ToolResult> {
        let content = self.read_file(path).await?;
        let occurrences = content.matches(old_str).count();
        if occurrences == 0 {
            return Err(DeskhandError::tool(format!(
                "No replacement was performed: found 0 occurrences of old_str in {}.",
                path.display(),
            )));
        }
        if occurrences > 1 {
            let lines: Vec<usize> = content
                .split('\n')
                .enumerate()
                .filter(|(_, line)| line.contains(old_str))
                .map(|(i, _)| i + 1)
                .collect();
            return Err(DeskhandError::tool(format!(
                "No replacement was performed: found {occurrences} occurrences of old_str in {} \
                 (lines {lines:?}). It must occur exactly once.",
                path.display(),
            )));
        }

        let new_content = content.replacen(old_str, new_str, 1);
        self.write_file(path, &new_content).await?;
        self.history
            .entry(path.to_path_buf())
            .or_default()
            .push(content.clone());

        // Line where the replacement starts, for the confirmation snippet.
        let prefix = &content[..content.find(old_str).unwrap_or(0)];
        let edit_line = prefix.matches('\n').count();
        let snippet = snippet_around(&new_content, edit_line, new_str.matches('\n').count());

        Ok(ToolResult::default().with_output(format!(
            "The file {} has been edited. {}Review the change and edit again if needed.",
            path.display(),
            snippet,
        )))
    }

    async fn insert(
        &mut self,
        path: &Path,
        insert_line: usize,
        new_text: &str,
    ) -> DeskhandResult<ToolResult> {
        let content = self.read_file(path).await?;
        let lines: Vec<&str> = content.split('\n').collect();
        let n = lines.len();
        if insert_line > n {
            return Err(DeskhandError::tool(format!(
                "Invalid `insert_line` parameter: {insert_line}. It should be within the range \
                 of lines of the file: [0, {n}].",
            )));
        }

        let inserted: Vec<&str> = new_text.split('\n').collect();
        let mut new_lines = Vec::with_capacity(n + inserted.len());
        new_lines.extend_from_slice(&lines[..insert_line]);
        new_lines.extend_from_slice(&inserted);
        new_lines.extend_from_slice(&lines[insert_line..]);
        let new_content = new_lines.join("\n");

        self.write_file(path, &new_content).await?;
        self.history
            .entry(path.to_path_buf())
            .or_default()
            .push(content);

        let snippet = snippet_around(&new_content, insert_line, inserted.len().saturating_sub(1));
        Ok(ToolResult::default().with_output(format!(
            "The file {} has been edited. {}Review the change and edit again if needed.",
            path.display(),
            snippet,
        )))
    }

    async fn read_file(&self, path: &Path) -> DeskhandResult<String> {
        tokio::fs::read_to_string(path).await.map_err(|e| {
            DeskhandError::tool(format!("Ran into {e} while trying to read {}", path.display()))
        })
    }

    async fn write_file(&self, path: &Path, content: &str) -> DeskhandResult<()> {
        tokio::fs::write(path, content).await.map_err(|e| {
            DeskhandError::tool(format!("Ran into {e} while trying to write {}", path.display()))
        })
    }
}

/// `cat -n`-style output for `content`, numbering from `init_line`.
fn numbered(path: &Path, content: &str, init_line: usize) -> String {
    let body: String = content
        .split('\n')
        .enumerate()
        .map(|(i, line)| format!("{:6}\t{line}\n", i + init_line))
        .collect();
    maybe_truncate(format!(
        "Here's the result of running `cat -n` on {}:\n{body}",
        path.display(),
    ))
}

/// Numbered excerpt of `content` around an edit starting at 0-based line
/// `edit_line` spanning `extra_lines` further lines.
fn snippet_around(content: &str, edit_line: usize, extra_lines: usize) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    let start = edit_line.saturating_sub(SNIPPET_CONTEXT_LINES);
    let end = (edit_line + extra_lines + SNIPPET_CONTEXT_LINES + 1).min(lines.len());
    let body: String = lines[start..end]
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:6}\t{line}\n", start + i + 1))
        .collect();
    format!("Here's a snippet of the edited region:\n{body}")
}

fn maybe_truncate(mut content: String) -> String {
    if content.len() > MAX_OUTPUT_CHARS {
        let mut cut = MAX_OUTPUT_CHARS;
        while !content.is_char_boundary(cut) {
            cut -= 1;
        }
        content.truncate(cut);
        content.push_str(TRUNCATED_NOTE);
    }
    content
}

/// Entries up to two levels deep, hidden names skipped, sorted for
/// deterministic output.
fn list_directory(path: &Path) -> DeskhandResult<String> {
    fn entries(dir: &Path) -> DeskhandResult<Vec<PathBuf>> {
        let mut found = Vec::new();
        let read = std::fs::read_dir(dir).map_err(|e| {
            DeskhandError::tool(format!("Ran into {e} while trying to list {}", dir.display()))
        })?;
        for entry in read.flatten() {
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            found.push(entry.path());
        }
        found.sort();
        Ok(found)
    }

    let mut lines = Vec::new();
    for top in entries(path)? {
        let is_dir = top.is_dir();
        lines.push(top.display().to_string());
        if is_dir {
            for nested in entries(&top)? {
                lines.push(nested.display().to_string());
            }
        }
    }
    Ok(lines.join("\n"))
}
