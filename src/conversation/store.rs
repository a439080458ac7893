//! YAML persistence for conversations.
//!
//! One conversation is one file under `~/.local/share/ramify/history/`,
//! holding `profile`, `system` and the ordered `messages` list with their
//! head flags. Multi-line content is written as literal block scalars.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};

use super::Conversation;
use crate::config::{Config, Profile};
use crate::constants::CONVERSATION_EXT;
use crate::message::Message;

/// On-disk shape of a conversation.
#[derive(Debug, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    profile: Profile,
    #[serde(default)]
    system: String,
    #[serde(default)]
    messages: Vec<Message>,
}

/// Serializes a conversation to YAML.
pub fn to_yaml(conversation: &Conversation) -> Result<String> {
    let document = Document {
        profile: conversation.profile().clone(),
        system: conversation.system().to_string(),
        messages: conversation.messages().to_vec(),
    };
    serde_yaml::to_string(&document).context("Failed to serialize conversation")
}

/// Parses a conversation from YAML, remembering where it came from.
///
/// Literal `\t` sequences in message content are turned back into tabs.
pub fn from_yaml(bytes: &[u8], file_name: &str) -> Result<Conversation> {
    let mut document: Document = serde_yaml::from_slice(bytes)
        .with_context(|| format!("Failed to parse conversation {file_name}"))?;
    for message in &mut document.messages {
        if message.content.contains("\\t") {
            message.content = message.content.replace("\\t", "\t");
        }
    }
    let mut conversation =
        Conversation::from_parts(document.profile, document.system, document.messages);
    conversation.set_file_name(file_name);
    Ok(conversation)
}

/// Writes the conversation into `dir`, returning the file name used.
///
/// Conversations without messages are not written and yield `None`. A
/// conversation that has no file name yet gets a timestamped one.
pub fn save_to(conversation: &mut Conversation, dir: &Path) -> Result<Option<String>> {
    if conversation.is_empty() {
        return Ok(None);
    }
    let file_name = match conversation.file_name() {
        Some(name) => name.to_string(),
        None => format!(
            "{}.{CONVERSATION_EXT}",
            Local::now().format("%Y%m%d-%H%M%S")
        ),
    };
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    let path = dir.join(&file_name);
    fs::write(&path, to_yaml(conversation)?)
        .with_context(|| format!("Failed to write conversation to {:?}", path))?;
    conversation.set_file_name(file_name.clone());
    tracing::debug!(path = %path.display(), "saved conversation");
    Ok(Some(file_name))
}

/// Saves into the history directory.
pub fn save(conversation: &mut Conversation) -> Result<Option<String>> {
    save_to(conversation, &Config::history_dir()?)
}

/// Locates a conversation to restore: a path as given, otherwise a name in
/// `dir` with `.yaml` appended when missing.
pub fn resolve_restore_path(name: &str, dir: &Path) -> Option<PathBuf> {
    let direct = PathBuf::from(name);
    if direct.is_file() {
        return Some(direct);
    }
    let mut file_name = name.to_string();
    if !file_name.ends_with(&format!(".{CONVERSATION_EXT}")) {
        file_name.push('.');
        file_name.push_str(CONVERSATION_EXT);
    }
    let candidate = dir.join(file_name);
    candidate.is_file().then_some(candidate)
}

/// Reads and parses a conversation to restore.
pub fn restore_from(name: &str, dir: &Path) -> Result<Conversation> {
    let path = resolve_restore_path(name, dir)
        .with_context(|| format!("No saved conversation matches '{name}'"))?;
    let bytes = fs::read(&path).with_context(|| format!("Failed to read {:?}", path))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    from_yaml(&bytes, &file_name)
}

/// Restores from the history directory.
pub fn restore(name: &str) -> Result<Conversation> {
    restore_from(name, &Config::history_dir()?)
}

/// A saved conversation file, as listed by `ramify history`.
#[derive(Debug, Clone)]
pub struct SavedEntry {
    pub path: PathBuf,
    pub modified: SystemTime,
}

impl SavedEntry {
    /// File name without the `.yaml` extension.
    pub fn name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Lists conversation files in `dir`, most recently modified first.
///
/// A missing directory is an empty history.
pub fn list_saved(dir: &Path) -> Result<Vec<SavedEntry>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {:?}", dir))? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        entries.push(SavedEntry { path, modified });
    }
    entries.sort_by(|a, b| b.modified.cmp(&a.modified));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    fn branched() -> Conversation {
        let mut conv = Conversation::new(Profile::default());
        conv.set_system("be brief");
        let first = conv.append(Role::User, "hi").id.clone();
        conv.append(Role::Assistant, "line one\nline two");
        conv.change_head(&first).unwrap();
        conv.append(Role::Assistant, "other branch");
        conv
    }

    #[test]
    fn yaml_round_trip_preserves_order_and_head() {
        let conv = branched();
        let yaml = to_yaml(&conv).unwrap();
        assert!(yaml.contains("profile:"));
        assert!(yaml.contains("system: be brief"));

        let restored = from_yaml(yaml.as_bytes(), "x.yaml").unwrap();
        assert_eq!(restored.messages(), conv.messages());
        assert_eq!(restored.head().unwrap().id, conv.head().unwrap().id);
        assert_eq!(restored.profile(), conv.profile());
        assert_eq!(restored.system(), "be brief");
        assert_eq!(restored.file_name(), Some("x.yaml"));
        assert_eq!(
            restored.messages().iter().filter(|m| m.head).count(),
            1
        );
    }

    #[test]
    fn multiline_content_uses_literal_blocks() {
        let yaml = to_yaml(&branched()).unwrap();
        assert!(yaml.contains("content: |"), "{yaml}");
    }

    #[test]
    fn tab_escapes_are_unescaped_on_load() {
        let yaml = r#"
system: ""
messages:
  - id: abc
    parent_id: ROOT
    role: user
    content: 'a\tb'
    head: true
"#;
        let conv = from_yaml(yaml.as_bytes(), "t.yaml").unwrap();
        assert_eq!(conv.messages()[0].content, "a\tb");
        assert_eq!(conv.head().unwrap().id, "abc");
    }

    #[test]
    fn save_and_restore_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut conv = branched();
        let name = save_to(&mut conv, dir.path()).unwrap().unwrap();
        assert!(name.ends_with(".yaml"));
        assert_eq!(conv.file_name(), Some(name.as_str()));

        let stem = name.trim_end_matches(".yaml");
        let restored = restore_from(stem, dir.path()).unwrap();
        assert_eq!(restored.messages(), conv.messages());

        let listed = list_saved(dir.path()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name(), stem);
    }

    #[test]
    fn empty_conversation_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let mut conv = Conversation::new(Profile::default());
        assert_eq!(save_to(&mut conv, dir.path()).unwrap(), None);
        assert!(list_saved(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn restore_of_missing_name_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(restore_from("nothing-here", dir.path()).is_err());
        assert!(list_saved(&dir.path().join("absent")).unwrap().is_empty());
    }
}
