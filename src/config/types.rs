//! Struct definitions and serde defaults for ramify configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::profile::Profile;

/// Root configuration for ramify, deserialized from `config.toml`.
///
/// Every field has a serde default so ramify can run without a config file.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    #[serde(default)]
    pub current_profile: Option<String>,
    /// Per-provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Named conversation profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

/// Provider-specific configuration map.
///
/// Each field corresponds to a supported LLM provider. Only providers
/// the user has configured will be `Some`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProviderConfig {
    pub openai: Option<ProviderEntry>,
    pub anthropic: Option<ProviderEntry>,
    pub ollama: Option<ProviderEntry>,
    pub openrouter: Option<ProviderEntry>,
}

/// Connection details for a single LLM provider.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProviderEntry {
    /// API key for authentication. Can also be set via environment variables.
    pub api_key: Option<String>,
    /// Custom base URL (proxies or self-hosted instances).
    pub base_url: Option<String>,
}
