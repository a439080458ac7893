//! Command-line interface definition and dispatch for ramify.
//!
//! Uses [`clap`] for argument parsing with derive macros. Each subcommand is
//! routed to its handler; saved-conversation listing lives in the
//! [`history`] submodule.

mod history;

use std::io::{self, IsTerminal, Read};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use crate::{chat, config::Config};

/// Top-level CLI structure for ramify.
#[derive(Parser)]
#[command(
    name = "ramify",
    about = "A terminal LLM chat with a branching conversation history"
)]
pub struct Cli {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by `chat` and `ask`.
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// Profile to use (defaults to `current_profile` from the config)
    #[arg(short, long)]
    pub profile: Option<String>,
    /// Model to use (overrides the profile; accepts provider/model)
    #[arg(short, long)]
    pub model: Option<String>,
    /// Provider to use (anthropic, openai, openrouter, ollama)
    #[arg(long)]
    pub provider: Option<String>,
    /// Restore a saved conversation by path or history name
    #[arg(short, long)]
    pub restore: Option<String>,
    /// Add files matching a glob pattern to a new conversation
    #[arg(short, long = "file")]
    pub files: Vec<String>,
    /// Fetch whole replies instead of streaming them
    #[arg(long)]
    pub rest: bool,
}

/// Available subcommands for the ramify CLI.
///
/// The `///` doc comments on variants double as `--help` text rendered by clap.
#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive conversation
    Chat {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Ask a one-shot question (piped stdin is sent too)
    Ask {
        #[command(flatten)]
        session: SessionArgs,
        /// The question to ask
        prompt: Vec<String>,
    },
    /// List saved conversations, or print one
    History {
        /// Conversation name or path
        name: Option<String>,
    },
    /// Manage conversation profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Subcommands for the `profile` command.
#[derive(Subcommand)]
pub enum ProfileAction {
    /// List configured profiles
    List,
    /// Make a profile the default
    Use { name: String },
}

/// Subcommands for the `config` command.
///
/// ramify's TOML configuration lives at the XDG config path
/// (`~/.config/ramify/config.toml`).
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current config (API keys masked)
    Show,
    /// Print the config file path
    Path,
}

/// Parses command-line arguments into a [`Cli`] struct.
///
/// Delegates to [`clap::Parser::parse`], which exits the process on invalid input.
pub fn parse() -> Cli {
    Cli::parse()
}

/// Dispatches the parsed CLI command to its handler.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Chat { session } => {
            let config = Config::load()?;
            chat::run_chat(config, session).await
        }
        Commands::Ask { session, prompt } => {
            let config = Config::load()?;
            let piped = read_piped_stdin()?;
            chat::run_ask(config, session, prompt.join(" "), piped).await
        }
        Commands::History { name } => match name {
            Some(name) => history::show(&name),
            None => history::list(),
        },
        Commands::Profile { action } => {
            let config = Config::load()?;
            match action {
                ProfileAction::List => {
                    let current = config.current_profile_name();
                    for name in config.profile_names() {
                        let marker = if name == current { "*" } else { " " };
                        let profile = &config.profiles[name];
                        println!(
                            "{} {} {}",
                            marker.green().bold(),
                            name.cyan(),
                            format!("{}/{}", profile.vendor, profile.model).dimmed()
                        );
                    }
                }
                ProfileAction::Use { name } => {
                    Config::set_current_profile(&name)?;
                    println!("{} {}", "current profile:".dimmed(), name.cyan());
                }
            }
            Ok(())
        }
        Commands::Config { action } => {
            match action {
                ConfigAction::Show => {
                    let config = Config::load()?;
                    let path = Config::config_path()?;
                    println!("{} {}", "Config path:".bold(), path.display());
                    println!();
                    let toml_str = toml::to_string_pretty(&masked(config))?;
                    println!("{}", toml_str);
                }
                ConfigAction::Path => println!("{}", Config::config_path()?.display()),
            }
            Ok(())
        }
    }
}

/// Reads stdin when it is piped rather than a terminal.
fn read_piped_stdin() -> Result<Option<String>> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }
    let mut input = String::new();
    stdin
        .lock()
        .read_to_string(&mut input)
        .context("Failed to read piped stdin")?;
    Ok(Some(input))
}

/// Replaces resolved API keys so `config show` never prints secrets.
fn masked(mut config: Config) -> Config {
    for entry in [
        &mut config.provider.openai,
        &mut config.provider.anthropic,
        &mut config.provider.ollama,
        &mut config.provider.openrouter,
    ]
    .into_iter()
    .flatten()
    {
        if let Some(key) = entry.api_key.as_mut().filter(|k| !k.is_empty()) {
            *key = "********".to_string();
        }
    }
    config
}
