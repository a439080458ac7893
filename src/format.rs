//! Terminal formatting for messages, conversation listings and replies.

use colored::Colorize;

use crate::conversation::Conversation;
use crate::message::{Message, Role};

/// Header line for a stored message: `[id6] role -> [parent6] Head`.
pub fn message_header(msg: &Message) -> String {
    let label = format!(
        "[{}] {} -> [{}]",
        msg.short_id(),
        msg.role,
        msg.short_parent()
    );
    if msg.head {
        format!("{} {}", label.bright_yellow(), "Head".bright_blue())
    } else {
        label.bright_yellow().to_string()
    }
}

/// Format a message for terminal display with its header and body.
pub fn format_message(msg: &Message) -> String {
    format!("{}\n{}", message_header(msg), format_body(&msg.content, &msg.role))
}

fn format_body(text: &str, role: &Role) -> String {
    match role {
        Role::User => indent(text),
        Role::Assistant => indent(&render_markdown_lite(text)),
        Role::System => indent(&text.dimmed().to_string()),
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prints the system prompt and every stored message, all branches included.
pub fn print_conversation(conversation: &Conversation) {
    if !conversation.system().is_empty() {
        println!("{}", "[System]".bright_yellow());
        println!("{}", indent(&conversation.system().dimmed().to_string()));
    }
    for msg in conversation.messages() {
        println!("{}", format_message(msg));
        println!();
    }
}

/// Minimal markdown renderer for terminal output.
/// Not a full parser. Handles the three most common patterns
/// in LLM output: bold, inline code, and fenced code blocks.
pub fn render_markdown_lite(text: &str) -> String {
    let mut output = String::new();
    let mut in_code_block = false;

    for line in text.lines() {
        if line.starts_with("```") {
            if in_code_block {
                in_code_block = false;
                output.push('\n');
            } else {
                in_code_block = true;
                let lang = line.trim_start_matches('`');
                if !lang.is_empty() {
                    output.push_str(&format!("  {}\n", lang.dimmed()));
                }
            }
            continue;
        }

        if in_code_block {
            output.push_str(&format!("  {}\n", line.dimmed()));
            continue;
        }

        output.push_str(&render_inline(line));
        output.push('\n');
    }

    if output.ends_with('\n') {
        output.pop();
    }
    output
}

/// Handle **bold** and `inline code` within a single line.
fn render_inline(line: &str) -> String {
    let mut result = String::new();
    let chars: Vec<char> = line.chars().collect();
    let len = chars.len();
    let mut i = 0;

    while i < len {
        if i + 1 < len && chars[i] == '*' && chars[i + 1] == '*' {
            if let Some(end) = find_closing(&chars, i + 2, &['*', '*']) {
                let bold_text: String = chars[i + 2..end].iter().collect();
                result.push_str(&bold_text.bold().to_string());
                i = end + 2;
                continue;
            }
        }

        if chars[i] == '`' {
            if let Some(end) = find_closing(&chars, i + 1, &['`']) {
                let code_text: String = chars[i + 1..end].iter().collect();
                result.push_str(&code_text.dimmed().to_string());
                i = end + 1;
                continue;
            }
        }

        result.push(chars[i]);
        i += 1;
    }

    result
}

fn find_closing(chars: &[char], start: usize, pat: &[char]) -> Option<usize> {
    (start..=chars.len().saturating_sub(pat.len()))
        .find(|&i| i + pat.len() <= chars.len() && chars[i..i + pat.len()] == *pat)
}
