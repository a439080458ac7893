//! `ramify history`: listing and printing saved conversations.

use anyhow::Result;
use chrono::{DateTime, Local};
use colored::Colorize;

use crate::config::Config;
use crate::constants::HISTORY_PREVIEW_CHARS;
use crate::conversation::store::{self, SavedEntry};
use crate::format;

/// Lists saved conversations, newest first, with a preview of their
/// opening message.
pub(crate) fn list() -> Result<()> {
    let entries = store::list_saved(&Config::history_dir()?)?;
    if entries.is_empty() {
        println!("{}", "No saved conversations.".dimmed());
        println!("Start one with: {}", "ramify chat".cyan());
        return Ok(());
    }

    let term_width = terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(80);
    let name_width = entries
        .iter()
        .map(|e| e.name().chars().count())
        .max()
        .unwrap_or(4)
        .max(4);
    let header_width = name_width + 2 + 18 + HISTORY_PREVIEW_CHARS;

    println!(
        "{} {} {}",
        format!("{:<nw$}", "NAME", nw = name_width + 1).bold(),
        format!("{:<18}", "SAVED").bold(),
        "FIRST MESSAGE".bold(),
    );
    println!("{}", "-".repeat(term_width.min(header_width)));

    for entry in &entries {
        // Pad first, then colorize to avoid ANSI escape code width issues
        let name_col = format!("{:<nw$}", entry.name(), nw = name_width + 1);
        let saved_col = format!("{:<18}", saved_at(entry));
        println!(
            "{} {} {}",
            name_col.cyan(),
            saved_col.dimmed(),
            preview(entry)
        );
    }
    println!();
    println!(
        "{} {} conversations. Restore with: {}",
        "total:".dimmed(),
        entries.len(),
        "ramify chat -r <name>".cyan()
    );
    Ok(())
}

/// Prints one saved conversation in full.
pub(crate) fn show(name: &str) -> Result<()> {
    let conversation = store::restore(name)?;
    format::print_conversation(&conversation);
    Ok(())
}

fn saved_at(entry: &SavedEntry) -> String {
    DateTime::<Local>::from(entry.modified)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// First characters of the conversation's opening message, on one line.
fn preview(entry: &SavedEntry) -> String {
    let Ok(bytes) = std::fs::read(&entry.path) else {
        return "(unreadable)".to_string();
    };
    let name = entry.name();
    match store::from_yaml(&bytes, &name) {
        Ok(conversation) => conversation
            .root_message()
            .map(|m| truncate(&m.content, HISTORY_PREVIEW_CHARS))
            .unwrap_or_default(),
        Err(err) => {
            tracing::debug!(file = %name, "unparsable conversation: {err:#}");
            "(unparsable)".to_string()
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > max {
        let cut: String = flat.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        flat
    }
}
