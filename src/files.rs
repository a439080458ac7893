//! Ingestion of `--file` glob patterns into conversation messages.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

/// A file read from disk, ready to become a user message.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedFile {
    pub path: PathBuf,
    pub contents: String,
}

impl IngestedFile {
    /// Message body quoting the file with its path.
    pub fn to_message(&self) -> String {
        format!(
            "Path: `{}`\n ```\n{}```",
            self.path.display(),
            self.contents
        )
    }
}

/// Expands every pattern and reads the matching files in order.
///
/// Bad patterns, directories and unreadable files are skipped with a
/// warning. A file matched by several patterns is read once.
pub fn ingest(patterns: &[String]) -> Vec<IngestedFile> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for pattern in patterns {
        let paths = match glob::glob(pattern) {
            Ok(paths) => paths,
            Err(err) => {
                tracing::warn!(pattern = %pattern, "invalid file pattern: {err}");
                continue;
            }
        };
        let mut matched = false;
        for entry in paths {
            let path = match entry {
                Ok(path) => path,
                Err(err) => {
                    tracing::warn!("skipping unreadable path: {err}");
                    continue;
                }
            };
            if !path.is_file() || !seen.insert(path.clone()) {
                continue;
            }
            matched = true;
            match fs::read_to_string(&path) {
                Ok(contents) => {
                    tracing::debug!(path = %path.display(), bytes = contents.len(), "ingested file");
                    files.push(IngestedFile { path, contents });
                }
                Err(err) => tracing::warn!(path = %path.display(), "skipping file: {err}"),
            }
        }
        if !matched {
            tracing::warn!(pattern = %pattern, "no new files matched");
        }
    }
    files
}
