//! The conversation state engine.
//!
//! A [`Conversation`] stores messages in insertion order and forms a tree
//! through `parent_id` links rooted at `ROOT`. A single head pointer selects
//! the active tip; the path from `ROOT` to the head is the only part of the
//! tree ever sent to a provider. Messages are never deleted, so every branch
//! stays reachable by id.

pub mod store;

use std::collections::HashMap;

use thiserror::Error;

use crate::config::Profile;
use crate::constants::ROOT_ID;
use crate::message::{Message, Role};

/// Failures of chain lookups and traversal.
#[derive(Debug, Error, PartialEq)]
pub enum ChainError {
    #[error("no message found with id prefix: {0}")]
    NotFound(String),
    #[error("no id prefix provided")]
    EmptyPrefix,
    #[error("message chain is corrupted: the parents of {0} never reach ROOT")]
    Corrupted(String),
}

/// A branching conversation with one active head.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    profile: Profile,
    system: String,
    messages: Vec<Message>,
    /// id -> index of the first message with that id.
    index: HashMap<String, usize>,
    head: Option<usize>,
    file_name: Option<String>,
}

impl Conversation {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            ..Default::default()
        }
    }

    /// Rebuilds a conversation from stored parts.
    ///
    /// The head is taken from the first message flagged `head`; any further
    /// flags are cleared so at most one message is head.
    pub fn from_parts(profile: Profile, system: String, messages: Vec<Message>) -> Self {
        let mut conversation = Self {
            profile,
            system,
            ..Default::default()
        };
        for mut message in messages {
            let position = conversation.messages.len();
            if message.head {
                if conversation.head.is_some() {
                    tracing::warn!(id = %message.id, "dropping duplicate head flag");
                    message.head = false;
                } else {
                    conversation.head = Some(position);
                }
            }
            conversation
                .index
                .entry(message.id.clone())
                .or_insert(position);
            conversation.messages.push(message);
        }
        conversation
    }

    /// All stored messages in insertion order, every branch included.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn set_system(&mut self, system: impl Into<String>) {
        self.system = system.into();
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn profile_mut(&mut self) -> &mut Profile {
        &mut self.profile
    }

    /// Name of the file this conversation was restored from or saved to.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn set_file_name(&mut self, name: impl Into<String>) {
        self.file_name = Some(name.into());
    }

    /// The head message, or `None` when the head is at `ROOT`.
    pub fn head(&self) -> Option<&Message> {
        self.head.map(|i| &self.messages[i])
    }

    /// The head message, or the synthetic system message when at `ROOT`.
    pub fn last(&self) -> Message {
        self.head()
            .cloned()
            .unwrap_or_else(|| self.system_message())
    }

    /// Synthetic message representing the system prompt at `ROOT`.
    pub fn system_message(&self) -> Message {
        Message::system(&self.system)
    }

    /// First message attached directly below the system prompt.
    pub fn root_message(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.is_root_child())
    }

    /// Appends a message below the current head and makes it the new head.
    pub fn append(&mut self, role: Role, content: impl Into<String>) -> &Message {
        let parent = self
            .head()
            .map(|m| m.id.clone())
            .unwrap_or_else(|| ROOT_ID.to_string());
        let mut message = Message::new(role, content, parent);
        if role == Role::User {
            message.author_name = self.profile.user_name.clone();
        }

        let position = self.messages.len();
        self.index.entry(message.id.clone()).or_insert(position);
        self.messages.push(message);
        self.set_head(Some(position));

        let message = &self.messages[position];
        tracing::debug!(id = message.short_id(), parent = message.short_parent(), role = %role, "appended message");
        message
    }

    /// First message, in insertion order, whose id starts with `prefix`.
    ///
    /// Several matches are not an error: the earliest inserted one wins.
    pub fn find_by_id_prefix(&self, prefix: &str) -> Result<&Message, ChainError> {
        if prefix.is_empty() {
            return Err(ChainError::EmptyPrefix);
        }
        self.messages
            .iter()
            .find(|m| m.id.starts_with(prefix))
            .ok_or_else(|| ChainError::NotFound(prefix.to_string()))
    }

    /// Moves the head to the message matching `target`, or to `ROOT`.
    ///
    /// Returns the new head (the synthetic system message for `ROOT`). On
    /// failure the head is left where it was.
    pub fn change_head(&mut self, target: &str) -> Result<Message, ChainError> {
        if target == ROOT_ID {
            self.set_head(None);
            return Ok(self.system_message());
        }
        let id = self.find_by_id_prefix(target)?.id.clone();
        let position = self.index[&id];
        self.set_head(Some(position));
        Ok(self.messages[position].clone())
    }

    /// Messages from `ROOT` to the head, root first. Empty at `ROOT`.
    ///
    /// The walk is bounded by the number of stored messages, so a cycle or a
    /// dangling parent in restored data is reported instead of looping.
    pub fn path_from_head(&self) -> Result<Vec<&Message>, ChainError> {
        let mut path = Vec::new();
        let Some(mut position) = self.head else {
            return Ok(path);
        };
        loop {
            let message = &self.messages[position];
            path.push(message);
            if message.is_root_child() {
                break;
            }
            if path.len() >= self.messages.len() {
                return Err(ChainError::Corrupted(message.id.clone()));
            }
            position = *self
                .index
                .get(&message.parent_id)
                .ok_or_else(|| ChainError::Corrupted(message.id.clone()))?;
        }
        path.reverse();
        Ok(path)
    }

    /// Replaces a message's content in place.
    ///
    /// The id is not recomputed and the head does not move, so children and
    /// previously noted ids keep pointing at this message.
    pub fn modify_content(&mut self, id: &str, content: impl Into<String>) -> Result<(), ChainError> {
        let position = *self
            .index
            .get(id)
            .ok_or_else(|| ChainError::NotFound(id.to_string()))?;
        self.messages[position].content = content.into();
        Ok(())
    }

    fn set_head(&mut self, next: Option<usize>) {
        if let Some(previous) = self.head {
            self.messages[previous].head = false;
        }
        if let Some(position) = next {
            self.messages[position].head = true;
        }
        self.head = next;
    }
}
