//! File loading, merging and writing for ramify configuration.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::types::{Config, ProviderConfig};
use crate::constants::{DEFAULT_MODEL, DEFAULT_PROFILE, DEFAULT_SYSTEM_PROMPT, DEFAULT_USER_NAME};

impl Config {
    /// Loads the global config from `~/.config/ramify/config.toml`.
    ///
    /// If no config file exists, creates one with a default profile and
    /// `{env:VAR}` placeholders for API keys, and returns it.
    pub(super) fn load_global() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            let default_toml = default_config_toml();
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &default_toml)
                .with_context(|| format!("Failed to write default config to {:?}", path))?;
            tracing::debug!(path = %path.display(), "wrote default config");
            return toml::from_str(&default_toml)
                .with_context(|| "Failed to parse default config".to_string());
        }
        Self::load_file(&path)
    }

    /// Parses a single config file.
    pub(super) fn load_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse config at {:?}", path))
    }

    /// Look for ramify.toml in current dir, then walk up to git root.
    pub(super) fn load_project() -> Result<Option<Config>> {
        let mut dir = std::env::current_dir()?;
        loop {
            let candidate = dir.join(crate::constants::PROJECT_CONFIG_FILENAME);
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "using project config");
                return Self::load_file(&candidate).map(Some);
            }
            // Stop at git root or filesystem root
            if dir.join(".git").exists() || !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Merge project config over global config.
    ///
    /// Project values win when present; project profiles are added to (or
    /// replace same-named) global profiles.
    pub(super) fn merge(global: Config, project: Config) -> Config {
        let mut profiles = global.profiles;
        profiles.extend(project.profiles);
        Config {
            current_profile: project.current_profile.or(global.current_profile),
            provider: ProviderConfig {
                openai: project.provider.openai.or(global.provider.openai),
                anthropic: project.provider.anthropic.or(global.provider.anthropic),
                ollama: project.provider.ollama.or(global.provider.ollama),
                openrouter: project.provider.openrouter.or(global.provider.openrouter),
            },
            profiles,
        }
    }

    /// Writes `current_profile` into the global config file.
    ///
    /// Works on the raw file so `{env:VAR}` placeholders are preserved.
    pub fn set_current_profile(name: &str) -> Result<()> {
        let loaded = Self::load()?;
        anyhow::ensure!(
            loaded.profiles.contains_key(name),
            "Profile '{}' is not defined. Available: {}",
            name,
            loaded.profile_names().join(", ")
        );

        let mut global = Self::load_global()?;
        global.current_profile = Some(name.to_string());
        let path = Self::config_path()?;
        let toml_str = toml::to_string_pretty(&global)?;
        fs::write(&path, toml_str)
            .with_context(|| format!("Failed to write config to {:?}", path))?;
        Ok(())
    }
}

fn default_config_toml() -> String {
    format!(
        r#"current_profile = "{profile}"

[provider.anthropic]
api_key = "{{env:ANTHROPIC_API_KEY}}"

[provider.openai]
api_key = "{{env:OPENAI_API_KEY}}"

[provider.openrouter]
api_key = "{{env:OPENROUTER_API_KEY}}"

[provider.ollama]
base_url = "http://localhost:11434"

[profiles.{profile}]
profile_name = "{profile}"
user_name = "{user}"
vendor = "anthropic"
model = "{model}"
system_context = "{system}"
auto_save = true

[profiles.{profile}.parameters]
temperature = 0.0
max_tokens = 0
"#,
        profile = DEFAULT_PROFILE,
        user = DEFAULT_USER_NAME,
        model = DEFAULT_MODEL,
        system = DEFAULT_SYSTEM_PROMPT,
    )
}
