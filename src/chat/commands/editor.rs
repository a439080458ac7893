//! External editor integration for composing and editing messages.
//!
//! The scratch file lives in ramify's data directory and is removed when
//! the [`NamedTempFile`] drops, whatever way the edit ends.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::constants::{EDITOR_FILE_PREFIX, EDITOR_HINT};
use crate::message::Message;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("failed to prepare the editor scratch file: {0}")]
    Scratch(#[from] io::Error),
    #[error("failed to launch editor `{command}`: {source}")]
    Launch { command: String, source: io::Error },
    #[error("editor `{command}` exited with {status}")]
    Failed { command: String, status: ExitStatus },
}

/// Lets the user edit a seeded text buffer and returns what they saved.
pub trait TextEditor {
    fn edit(&self, seed: &str) -> Result<String, EditorError>;
}

/// Runs `$EDITOR` (or a platform default) on a scratch file.
pub struct ExternalEditor {
    command: String,
    scratch_dir: PathBuf,
}

impl ExternalEditor {
    pub fn new(command: impl Into<String>, scratch_dir: PathBuf) -> Self {
        Self {
            command: command.into(),
            scratch_dir,
        }
    }

    /// Uses `$EDITOR`, falling back to `notepad.exe` on Windows and `vim`
    /// elsewhere.
    pub fn from_env(scratch_dir: PathBuf) -> Self {
        let command = std::env::var("EDITOR")
            .ok()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| {
                if cfg!(windows) {
                    "notepad.exe".to_string()
                } else {
                    "vim".to_string()
                }
            });
        Self::new(command, scratch_dir)
    }
}

impl TextEditor for ExternalEditor {
    fn edit(&self, seed: &str) -> Result<String, EditorError> {
        fs::create_dir_all(&self.scratch_dir)?;
        let mut file = tempfile::Builder::new()
            .prefix(EDITOR_FILE_PREFIX)
            .suffix(".txt")
            .tempfile_in(&self.scratch_dir)?;
        file.write_all(seed.as_bytes())?;
        file.flush()?;

        let status = editor_command(&self.command, &file)
            .status()
            .map_err(|source| EditorError::Launch {
                command: self.command.clone(),
                source,
            })?;
        if !status.success() {
            return Err(EditorError::Failed {
                command: self.command.clone(),
                status,
            });
        }

        Ok(fs::read_to_string(file.path())?)
    }
}

/// VS Code returns immediately unless told to wait for the tab to close.
fn editor_command(editor: &str, file: &NamedTempFile) -> Command {
    let mut command = Command::new(editor);
    if editor.contains("code") {
        command.arg("--wait");
    }
    command.arg(file.path());
    command
}

/// Seed text: optional content, the save hint, then the active path
/// newest-first as comment lines.
pub fn scratch_document(content: &str, path: &[&Message]) -> String {
    let mut doc = format!("{content}\n\n{EDITOR_HINT}\n");
    for msg in path.iter().rev() {
        let head = if msg.head { "Head" } else { "" };
        doc.push_str(&format!(
            "#\n# {} -> {} [{}] {}\n",
            msg.short_id(),
            msg.short_parent(),
            msg.role,
            head
        ));
        for line in msg.content.split('\n') {
            doc.push_str(&format!("#   {line}\n"));
        }
    }
    doc
}

/// Drops lines starting with `#` and trims the rest.
pub fn strip_comments(text: &str) -> String {
    text.lines()
        .filter(|line| !line.starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
