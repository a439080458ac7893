//! Centralized constants for ramify.
//!
//! All magic numbers, default strings, and configuration constants live here
//! so they can be changed in one place.

/// Application name used in CLI output and directory paths.
pub const APP_NAME: &str = "ramify";

/// Default LLM model identifier.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-6";

/// Maximum tokens for LLM completions when the profile leaves it unset.
pub const MAX_TOKENS: u64 = 4096;

/// Default system prompt for the built-in profile.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant in the terminal. \
Be concise. Use code blocks with language tags when showing code.";

/// Configuration filename.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Per-project configuration filename.
pub const PROJECT_CONFIG_FILENAME: &str = "ramify.toml";

/// Readline history filename.
pub const INPUT_HISTORY_FILENAME: &str = "input_history.txt";

/// Directory (under the data dir) holding saved conversations.
pub const CONVERSATION_DIR: &str = "history";

/// Extension of saved conversation files.
pub const CONVERSATION_EXT: &str = "yaml";

/// Default LLM model identifier for OpenAI.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1";

/// Default LLM model identifier for OpenRouter.
pub const DEFAULT_OPENROUTER_MODEL: &str = "arcee-ai/trinity-large-preview:free";

/// Default model for Ollama.
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3";

/// Default Ollama API base URL.
pub const OLLAMA_DEFAULT_BASE_URL: &str = "http://localhost:11434";

// --- Provider defaults ---

/// Default provider when none is configured.
pub const DEFAULT_PROVIDER: &str = "anthropic";

// --- Conversation ---

/// Parent id of messages attached directly below the system prompt.
pub const ROOT_ID: &str = "ROOT";

/// Number of id characters shown in prompts and listings.
pub const SHORT_ID_LEN: usize = 6;

/// Character that marks an input line as an interactive command.
pub const COMMAND_SENTINEL: char = ':';

/// Profile name used when nothing is configured.
pub const DEFAULT_PROFILE: &str = "default";

/// Display name for the user when the profile does not set one.
pub const DEFAULT_USER_NAME: &str = "you";

// --- Generation parameters ---

/// Maximum number of stop sequences a provider accepts.
pub const MAX_STOP_SEQUENCES: usize = 4;

// --- Editor ---

/// Prefix of scratch files handed to the external editor.
pub const EDITOR_FILE_PREFIX: &str = "ramify-editor-";

/// Footer line placed above the commented context in editor scratch files.
pub const EDITOR_HINT: &str = "# Save and close editor to continue";

/// Root-message preview length in `history` listings.
pub const HISTORY_PREVIEW_CHARS: usize = 50;
