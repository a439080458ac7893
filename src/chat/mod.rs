//! Interactive dialog and one-shot requests for ramify.
//!
//! The dialog reads lines with [`rustyline`], hands `:` lines to the command
//! interpreter and everything else to the provider as a new user turn. Each
//! request sends only the path from `ROOT` to the head, so moving the head
//! switches the model's view of the conversation.

mod commands;
mod seed;
mod turn;

use anyhow::{bail, Result};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::{self, IsTerminal, Write};

use crate::cli::SessionArgs;
use crate::config::Config;
use crate::constants::{COMMAND_SENTINEL, INPUT_HISTORY_FILENAME};
use crate::conversation::{store, Conversation};
use crate::format;
use crate::message::Role;
use crate::output::StdoutRenderer;
use crate::provider::{resolve_model, ChatProvider, Provider, RetrieveMode};

use commands::{CommandAction, CommandContext, CommandError, ExternalEditor};
use turn::TurnOutcome;

/// One line of user input, classified.
#[derive(Debug, PartialEq)]
pub(crate) enum Input<'a> {
    Empty,
    Command(&'a str),
    Prompt(&'a str),
}

pub(crate) fn classify(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        Input::Empty
    } else if line.starts_with(COMMAND_SENTINEL) {
        Input::Command(line)
    } else {
        Input::Prompt(line)
    }
}

/// Resolves vendor and model for the conversation and builds the provider.
///
/// The selection is written back onto the conversation's profile so a saved
/// conversation remembers what answered it.
fn select_provider(
    config: &Config,
    args: &SessionArgs,
    conversation: &mut Conversation,
) -> Result<Provider> {
    let selection = resolve_model(
        args.provider.as_deref(),
        args.model.as_deref(),
        conversation.profile(),
    )?;
    let profile = conversation.profile_mut();
    profile.vendor = selection.provider.as_str().to_string();
    profile.model = selection.model.clone();
    Provider::from_config(config, &selection)
}

fn retrieve_mode(args: &SessionArgs) -> RetrieveMode {
    if args.rest {
        RetrieveMode::Rest
    } else {
        RetrieveMode::Stream
    }
}

/// Saves the conversation when its profile asks for it.
fn auto_save(conversation: &mut Conversation) -> Result<()> {
    if !conversation.profile().auto_save {
        return Ok(());
    }
    if let Some(name) = store::save(conversation)? {
        println!("{} {}", "saved".dimmed(), name);
    }
    Ok(())
}

/// Runs one turn and prints its outcome.
async fn respond(conversation: &mut Conversation, provider: &dyn ChatProvider, mode: RetrieveMode) {
    let mut renderer = StdoutRenderer::new();
    match turn::submit_turn(conversation, provider, mode, &mut renderer).await {
        TurnOutcome::Replied(reply) => {
            if io::stdout().is_terminal() && renderer.chunk_count() > 0 {
                // Erase the raw text and reprint it with formatting
                print!("\x1b[{}A\x1b[J", renderer.visual_line_count());
                io::stdout().flush().ok();
                println!("{}", format::render_markdown_lite(&reply));
            }
            let id = conversation.last();
            println!("{}", format!("[{}]", id.short_id()).bright_yellow());
        }
        TurnOutcome::Cancelled => {
            println!();
            eprintln!("{}", "cancelled.".dimmed());
        }
        TurnOutcome::Failed(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
        }
    }
}

/// Runs the interactive dialog.
///
/// # Readline behavior
///
/// - **Ctrl+C** while a reply is arriving: cancels that request only
/// - **Ctrl+C** or **Ctrl+D** at the prompt: exits, auto-saving per profile
/// - Readline history is persisted to `~/.cache/ramify/input_history.txt`
pub async fn run_chat(config: Config, args: SessionArgs) -> Result<()> {
    let mut conversation = seed::open_conversation(&config, &args)?;
    let provider = select_provider(&config, &args, &mut conversation)?;
    let mode = retrieve_mode(&args);

    let profile = conversation.profile();
    println!(
        "{} [profile: {}] [model: {}] (Ctrl+D to exit)",
        "ramify chat".bold().cyan(),
        profile.profile_name.yellow(),
        provider.model().yellow(),
    );
    if mode == RetrieveMode::Rest {
        println!("{}", "REST mode".dimmed());
    }
    if let Some(name) = conversation.file_name() {
        println!("{} {}", "restored".dimmed(), name);
        for msg in conversation.path_from_head()? {
            println!("{}", format::format_message(msg));
        }
    }

    let editor = ExternalEditor::from_env(Config::data_dir()?);
    let config_dir = Config::config_dir()?;
    let ctx = CommandContext {
        editor: &editor,
        config_dir: &config_dir,
        open_dir: &commands::open_in_file_manager,
    };

    let mut rl = DefaultEditor::new()?;
    let history_path = Config::cache_dir()?.join(INPUT_HISTORY_FILENAME);
    if history_path.exists() {
        let _ = rl.load_history(&history_path);
    }

    loop {
        println!();
        let prompt = format!("{} > ", conversation.last().short_id());
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".dimmed());
                break;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                break;
            }
        };

        match classify(&line) {
            Input::Empty => continue,
            Input::Command(command) => {
                let _ = rl.add_history_entry(command);
                match commands::execute(command, &mut conversation, &ctx) {
                    Ok(CommandAction::Handled) => continue,
                    Ok(CommandAction::Retrieve) => {
                        if let Some(head) = conversation.head() {
                            println!("{}", format::format_message(head));
                        }
                    }
                    Err(CommandError::ShouldExit) => break,
                    Err(e) => {
                        eprintln!("{} {}", "error:".red().bold(), e);
                        continue;
                    }
                }
            }
            Input::Prompt(text) => {
                let _ = rl.add_history_entry(text);
                conversation.append(Role::User, text);
            }
        }

        println!();
        respond(&mut conversation, &provider, mode).await;
    }

    println!("{}", "goodbye.".dimmed());
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = rl.save_history(&history_path);

    auto_save(&mut conversation)
}

/// Sends a single prompt (plus piped input) and prints the reply.
pub async fn run_ask(
    config: Config,
    args: SessionArgs,
    prompt: String,
    piped: Option<String>,
) -> Result<()> {
    let mut conversation = seed::open_conversation(&config, &args)?;
    let provider = select_provider(&config, &args, &mut conversation)?;

    if let Some(input) = piped.filter(|s| !s.trim().is_empty()) {
        conversation.append(Role::User, input);
    }
    if !prompt.trim().is_empty() {
        conversation.append(Role::User, prompt.trim());
    }
    if conversation.head().map(|m| m.role) != Some(Role::User) {
        bail!("No prompt provided. Usage: ramify ask \"your question here\"");
    }

    let mut renderer = StdoutRenderer::new();
    let outcome =
        turn::submit_turn(&mut conversation, &provider, retrieve_mode(&args), &mut renderer).await;
    auto_save(&mut conversation)?;
    match outcome {
        TurnOutcome::Replied(_) => Ok(()),
        TurnOutcome::Cancelled => {
            eprintln!("{}", "cancelled.".dimmed());
            Ok(())
        }
        TurnOutcome::Failed(err) => Err(err.context("Request failed")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_input_lines() {
        assert_eq!(classify("   "), Input::Empty);
        assert_eq!(classify("  :move ROOT "), Input::Command(":move ROOT"));
        assert_eq!(classify("what is :this?"), Input::Prompt("what is :this?"));
    }
}
