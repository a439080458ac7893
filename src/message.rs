//! Message types for ramify's conversation history.
//!
//! A [`Message`] is one node of the conversation tree. Its `id` is a content
//! address derived from `(role, content, parent_id)` at creation time, which
//! makes ids reproducible and lets users refer to messages by short prefix.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants::{ROOT_ID, SHORT_ID_LEN};

/// The role of a message sender in the conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a conversation.
///
/// `head` mirrors the conversation's head pointer: it is maintained by
/// [`Conversation`](crate::conversation::Conversation) and is only
/// authoritative when read back from a saved file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub parent_id: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub head: bool,
}

impl Message {
    /// Builds a message whose id is the content address of its fields.
    pub fn new(role: Role, content: impl Into<String>, parent_id: impl Into<String>) -> Self {
        let content = content.into();
        let parent_id = parent_id.into();
        Self {
            id: content_id(&[role.as_str(), &content, &parent_id]),
            parent_id,
            role,
            content,
            author_name: String::new(),
            head: false,
        }
    }

    /// Synthetic message standing for the system prompt at `ROOT`.
    pub fn system(prompt: &str) -> Self {
        Self {
            id: content_id(&[prompt]),
            parent_id: ROOT_ID.to_string(),
            role: Role::System,
            content: prompt.to_string(),
            author_name: String::new(),
            head: false,
        }
    }

    pub fn short_id(&self) -> &str {
        short(&self.id)
    }

    pub fn short_parent(&self) -> &str {
        short(&self.parent_id)
    }

    pub fn is_root_child(&self) -> bool {
        self.parent_id == ROOT_ID
    }
}

/// Hex SHA-256 over the concatenation of `parts`.
pub fn content_id(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Truncates an id for display. `ROOT` is short enough to pass through.
pub fn short(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_depends_on_role_content_and_parent() {
        let a = Message::new(Role::User, "hello", ROOT_ID);
        let b = Message::new(Role::User, "hello", ROOT_ID);
        assert_eq!(a.id, b.id);
        assert_eq!(a.id.len(), 64);

        assert_ne!(a.id, Message::new(Role::Assistant, "hello", ROOT_ID).id);
        assert_ne!(a.id, Message::new(Role::User, "hello!", ROOT_ID).id);
        assert_ne!(a.id, Message::new(Role::User, "hello", &a.id).id);
    }

    #[test]
    fn short_ids() {
        let m = Message::new(Role::User, "x", ROOT_ID);
        assert_eq!(m.short_id().len(), 6);
        assert!(m.id.starts_with(m.short_id()));
        assert_eq!(m.short_parent(), "ROOT");
        assert_eq!(short("abc"), "abc");
    }

    #[test]
    fn role_serializes_lowercase() {
        let yaml = serde_yaml::to_string(&Role::Assistant).unwrap();
        assert_eq!(yaml.trim(), "assistant");
        let role: Role = serde_yaml::from_str("user").unwrap();
        assert_eq!(role, Role::User);
    }
}
