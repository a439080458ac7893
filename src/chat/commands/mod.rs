//! `:` command interpreter for the chat dialog.
//!
//! Commands are matched by exact name or alias first, then by an
//! unambiguous prefix of a name. Every handler mutates the conversation in
//! place and returns a [`CommandAction`] telling the dialog whether the new
//! head needs a reply.

mod editor;
mod params;

pub use editor::{EditorError, ExternalEditor, TextEditor};

use std::io;
use std::path::Path;
use std::process::Command;

use colored::Colorize;
use thiserror::Error;

use crate::config::ParamError;
use crate::constants::COMMAND_SENTINEL;
use crate::conversation::{ChainError, Conversation};
use crate::format;
use crate::message::{Message, Role};

pub(crate) const NO_ALIASES: &[&str] = &[];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommandKind {
    History,
    Move,
    Config,
    Editor,
    Modify,
    Param,
    Help,
    Exit,
}

pub(crate) struct CommandSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub usage: &'static str,
    pub description: &'static str,
    pub kind: CommandKind,
}

pub(crate) const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "history",
        aliases: NO_ALIASES,
        usage: ":history",
        description: "Show every stored message, all branches included.",
        kind: CommandKind::History,
    },
    CommandSpec {
        name: "move",
        aliases: NO_ALIASES,
        usage: ":move <id|ROOT>",
        description: "Move the head to another message.",
        kind: CommandKind::Move,
    },
    CommandSpec {
        name: "config",
        aliases: NO_ALIASES,
        usage: ":config",
        description: "Open the configuration directory.",
        kind: CommandKind::Config,
    },
    CommandSpec {
        name: "editor",
        aliases: NO_ALIASES,
        usage: ":editor [id|latest]",
        description: "Compose a message in $EDITOR, or rewrite one of your messages as a new branch.",
        kind: CommandKind::Editor,
    },
    CommandSpec {
        name: "modify",
        aliases: NO_ALIASES,
        usage: ":modify <id>",
        description: "Edit a past message in place. The head does not move.",
        kind: CommandKind::Modify,
    },
    CommandSpec {
        name: "param",
        aliases: NO_ALIASES,
        usage: ":param [name [value]]",
        description: "Show or set a generation parameter.",
        kind: CommandKind::Param,
    },
    CommandSpec {
        name: "help",
        aliases: NO_ALIASES,
        usage: ":help",
        description: "Show this help.",
        kind: CommandKind::Help,
    },
    CommandSpec {
        name: "exit",
        aliases: &["q", "quit"],
        usage: ":exit",
        description: "Exit ramify.",
        kind: CommandKind::Exit,
    },
];

#[derive(Debug, Error)]
pub enum CommandError {
    /// The user asked to leave. Not a failure.
    #[error("exit requested")]
    ShouldExit,
    #[error("unknown command: {input}\n\n{listing}")]
    Unknown { input: String, listing: String },
    #[error("ambiguous command: {input} (could be {candidates})")]
    Ambiguous { input: String, candidates: String },
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Param(#[from] ParamError),
    #[error("message {0} is not one of your messages")]
    NotUserMessage(String),
    #[error("no user message on the active path")]
    NoUserMessage,
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error("failed to open {path}: {source}")]
    Open { path: String, source: io::Error },
}

/// What the dialog does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
    /// Nothing more to do; prompt again.
    Handled,
    /// A user message was appended as the new head; fetch a reply.
    Retrieve,
}

/// Collaborators the handlers need beyond the conversation.
pub struct CommandContext<'a> {
    pub editor: &'a dyn TextEditor,
    pub config_dir: &'a Path,
    pub open_dir: &'a dyn Fn(&Path) -> io::Result<()>,
}

pub(crate) enum PrefixMatch<T> {
    Found(T),
    Ambiguous(Vec<&'static str>),
    NoMatch,
}

/// Exact name or alias first, then a unique strict prefix of a name.
pub(crate) fn match_prefix<T: Copy>(
    input: &str,
    entries: &[(&'static str, &'static [&'static str], T)],
) -> PrefixMatch<T> {
    if input.is_empty() {
        return PrefixMatch::NoMatch;
    }
    if let Some((_, _, value)) = entries
        .iter()
        .find(|(name, aliases, _)| *name == input || aliases.contains(&input))
    {
        return PrefixMatch::Found(*value);
    }
    let hits: Vec<_> = entries
        .iter()
        .filter(|(name, _, _)| name.starts_with(input))
        .collect();
    match hits.as_slice() {
        [] => PrefixMatch::NoMatch,
        [(_, _, value)] => PrefixMatch::Found(*value),
        many => PrefixMatch::Ambiguous(many.iter().map(|(name, _, _)| *name).collect()),
    }
}

pub(crate) fn match_command(input: &str) -> Result<CommandKind, CommandError> {
    let entries: Vec<_> = COMMANDS
        .iter()
        .map(|c| (c.name, c.aliases, c.kind))
        .collect();
    match match_prefix(input, &entries) {
        PrefixMatch::Found(kind) => Ok(kind),
        PrefixMatch::Ambiguous(names) => Err(CommandError::Ambiguous {
            input: format!("{COMMAND_SENTINEL}{input}"),
            candidates: names
                .iter()
                .map(|n| format!("{COMMAND_SENTINEL}{n}"))
                .collect::<Vec<_>>()
                .join(", "),
        }),
        PrefixMatch::NoMatch => Err(CommandError::Unknown {
            input: format!("{COMMAND_SENTINEL}{input}"),
            listing: command_listing(),
        }),
    }
}

pub(crate) fn command_listing() -> String {
    let mut out = String::new();
    for command in COMMANDS {
        out.push_str(&format!("  {:<22} - {}\n", command.usage, command.description));
    }
    out
}

/// Parses and runs one `:` command line.
pub fn execute(
    input: &str,
    conversation: &mut Conversation,
    ctx: &CommandContext<'_>,
) -> Result<CommandAction, CommandError> {
    let line = input.trim();
    let line = line.strip_prefix(COMMAND_SENTINEL).unwrap_or(line);
    let name = line.split(char::is_whitespace).next().unwrap_or_default();
    let args: Vec<&str> = line[name.len()..].split_whitespace().collect();

    let kind = match_command(name)?;
    tracing::debug!(command = ?kind, args = args.len(), "running command");

    match kind {
        CommandKind::History => {
            format::print_conversation(conversation);
            Ok(CommandAction::Handled)
        }
        CommandKind::Move => {
            let target = args.first().ok_or(CommandError::Usage(":move <id|ROOT>"))?;
            move_head(conversation, target)?;
            Ok(CommandAction::Handled)
        }
        CommandKind::Config => {
            (ctx.open_dir)(ctx.config_dir).map_err(|source| CommandError::Open {
                path: ctx.config_dir.display().to_string(),
                source,
            })?;
            Ok(CommandAction::Handled)
        }
        CommandKind::Editor => match args.first() {
            None => compose(conversation, ctx.editor),
            Some(target) => rewrite_own_turn(conversation, ctx.editor, target),
        },
        CommandKind::Modify => {
            let target = args.first().ok_or(CommandError::Usage(":modify <id>"))?;
            modify(conversation, ctx.editor, target)?;
            Ok(CommandAction::Handled)
        }
        CommandKind::Param => {
            params::run(&args, conversation)?;
            Ok(CommandAction::Handled)
        }
        CommandKind::Help => {
            println!("{}", "Commands:".bold());
            print!("{}", command_listing());
            println!("  {:<22} - {}", "Ctrl+C", "cancel a running request");
            println!("  {:<22} - {}", "Ctrl+D", "exit");
            Ok(CommandAction::Handled)
        }
        CommandKind::Exit => Err(CommandError::ShouldExit),
    }
}

fn move_head(conversation: &mut Conversation, target: &str) -> Result<(), CommandError> {
    let previous = conversation.last();
    let head = conversation.change_head(target)?;
    println!(
        "{} {} -> {}",
        "moved".dimmed(),
        previous.short_id(),
        head.short_id().bright_yellow()
    );
    println!("{}", format::format_message(&head));
    Ok(())
}

/// Seed for the editor: `content`, then the active path as comments.
fn scratch_for(conversation: &Conversation, content: &str) -> Result<String, CommandError> {
    let path = conversation.path_from_head()?;
    Ok(editor::scratch_document(content, &path))
}

/// Runs the editor and returns the cleaned text, or `None` when the user
/// saved nothing or left `original` unchanged.
fn edit_text(
    editor: &dyn TextEditor,
    seed: &str,
    original: Option<&str>,
) -> Result<Option<String>, CommandError> {
    let text = editor::strip_comments(&editor.edit(seed)?);
    if text.is_empty() || original.is_some_and(|o| o.trim() == text) {
        return Ok(None);
    }
    Ok(Some(text))
}

fn compose(
    conversation: &mut Conversation,
    editor: &dyn TextEditor,
) -> Result<CommandAction, CommandError> {
    let seed = scratch_for(conversation, "")?;
    match edit_text(editor, &seed, None)? {
        Some(text) => {
            conversation.append(Role::User, text);
            Ok(CommandAction::Retrieve)
        }
        None => Ok(CommandAction::Handled),
    }
}

/// Rewrites one of the user's messages as a sibling branch below the same
/// parent, leaving the original in place.
fn rewrite_own_turn(
    conversation: &mut Conversation,
    editor: &dyn TextEditor,
    target: &str,
) -> Result<CommandAction, CommandError> {
    let original: Message = if target.eq_ignore_ascii_case("latest") {
        conversation
            .path_from_head()?
            .into_iter()
            .rev()
            .find(|m| m.role == Role::User)
            .cloned()
            .ok_or(CommandError::NoUserMessage)?
    } else {
        let found = conversation.find_by_id_prefix(target)?;
        if found.role != Role::User {
            return Err(CommandError::NotUserMessage(found.short_id().to_string()));
        }
        found.clone()
    };

    let seed = scratch_for(conversation, &original.content)?;
    let Some(text) = edit_text(editor, &seed, Some(&original.content))? else {
        return Ok(CommandAction::Handled);
    };
    conversation.change_head(&original.parent_id)?;
    conversation.append(Role::User, text);
    Ok(CommandAction::Retrieve)
}

fn modify(
    conversation: &mut Conversation,
    editor: &dyn TextEditor,
    target: &str,
) -> Result<(), CommandError> {
    let original = conversation.find_by_id_prefix(target)?.clone();
    let seed = scratch_for(conversation, &original.content)?;
    if let Some(text) = edit_text(editor, &seed, Some(&original.content))? {
        conversation.modify_content(&original.id, text)?;
        println!("[{}] {}", original.short_id().bright_yellow(), "Modified.".dimmed());
    }
    Ok(())
}

/// Opens `path` with the platform's file manager.
pub fn open_in_file_manager(path: &Path) -> io::Result<()> {
    let opener = if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(windows) {
        "explorer"
    } else {
        "xdg-open"
    };
    Command::new(opener).arg(path).spawn().map(|_| ())
}

#[cfg(test)]
mod tests;
