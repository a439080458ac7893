//! Output rendering abstraction for ramify.
//!
//! Defines the [`Renderer`] trait that decouples provider output from the
//! display layer. Output is a side channel: providers render increments as
//! they arrive and still return the full reply text to the caller.

use colored::Colorize;
use std::io::{self, Write};

/// Sink for reply text produced by a provider.
pub trait Renderer {
    /// Render a single increment as it arrives.
    fn render_token(&mut self, token: &str);

    /// Called when the full response is complete.
    fn render_done(&mut self);

    /// Called when an error occurs during streaming.
    fn render_error(&mut self, err: &str);
}

/// Renders reply increments directly to stdout.
///
/// Each increment is printed immediately with an explicit flush so the user
/// sees a "typing" effect. The raw text is buffered for visual line counting
/// so the dialog can erase and reprint it with formatting.
pub struct StdoutRenderer {
    chunk_count: usize,
    buffer: String,
}

impl StdoutRenderer {
    pub fn new() -> Self {
        Self {
            chunk_count: 0,
            buffer: String::new(),
        }
    }

    /// Number of increments received.
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Calculates the number of cursor-up movements needed to erase
    /// all streamed output (raw text + render_done output).
    ///
    /// Accounts for terminal line wrapping by using the actual terminal width.
    pub fn visual_line_count(&self) -> usize {
        let width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80)
            .max(1);

        let content_lines: usize = self
            .buffer
            .split('\n')
            .map(|line| line.chars().count().div_ceil(width).max(1))
            .sum();

        // The first line needs no cursor-up; render_done adds one line.
        content_lines.saturating_sub(1) + 1
    }
}

impl Default for StdoutRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for StdoutRenderer {
    fn render_token(&mut self, token: &str) {
        self.buffer.push_str(token);
        print!("{}", token);
        io::stdout().flush().ok();
        self.chunk_count += 1;
    }

    fn render_done(&mut self) {
        println!();
    }

    fn render_error(&mut self, err: &str) {
        eprintln!();
        eprintln!("{} {}", "error:".red().bold(), err);
    }
}

/// Collects rendered text in memory.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct BufferRenderer {
    pub text: String,
    pub done: bool,
    pub errors: Vec<String>,
}

#[cfg(test)]
impl Renderer for BufferRenderer {
    fn render_token(&mut self, token: &str) {
        self.text.push_str(token);
    }

    fn render_done(&mut self) {
        self.done = true;
    }

    fn render_error(&mut self, err: &str) {
        self.errors.push(err.to_string());
    }
}
