//! Environment variable substitution, API key lookup and profile resolution.

use anyhow::Result;

use super::profile::Profile;
use super::types::{Config, ProviderEntry};
use crate::constants::DEFAULT_PROFILE;

impl Config {
    /// Resolve {env:VAR_NAME} patterns in string fields.
    pub(super) fn resolve_substitutions(&mut self) {
        if let Some(ref mut current) = self.current_profile {
            *current = Self::resolve_str(current);
        }
        Self::resolve_provider_entry(&mut self.provider.openai);
        Self::resolve_provider_entry(&mut self.provider.anthropic);
        Self::resolve_provider_entry(&mut self.provider.ollama);
        Self::resolve_provider_entry(&mut self.provider.openrouter);
        for profile in self.profiles.values_mut() {
            profile.system_context = Self::resolve_str(&profile.system_context);
            profile.model = Self::resolve_str(&profile.model);
        }
    }

    /// Resolves `{env:VAR}` patterns in a single provider entry's `api_key` and `base_url`.
    fn resolve_provider_entry(entry: &mut Option<ProviderEntry>) {
        if let Some(ref mut e) = entry {
            if let Some(ref mut key) = e.api_key {
                *key = Self::resolve_str(key);
            }
            if let Some(ref mut url) = e.base_url {
                *url = Self::resolve_str(url);
            }
        }
    }

    /// Replace {env:VAR} with the environment variable value.
    fn resolve_str(s: &str) -> String {
        let mut result = s.to_string();
        while let Some(start) = result.find("{env:") {
            let Some(end) = result[start..].find('}') else {
                break;
            };
            let var_name = &result[start + 5..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        }
        result
    }

    /// Resolve API key for a provider: env var first, then config value.
    ///
    /// Empty values count as unset.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        let env_key = format!("{}_API_KEY", provider.to_uppercase());
        if let Ok(val) = std::env::var(&env_key) {
            if !val.is_empty() {
                return Some(val);
            }
        }

        self.provider_entry(provider)
            .and_then(|e| e.api_key.clone())
            .filter(|key| !key.is_empty())
    }

    /// Configured base URL override for a provider.
    pub fn base_url(&self, provider: &str) -> Option<&str> {
        self.provider_entry(provider)
            .and_then(|e| e.base_url.as_deref())
            .filter(|url| !url.is_empty())
    }

    fn provider_entry(&self, provider: &str) -> Option<&ProviderEntry> {
        let entry = match provider {
            "openai" => &self.provider.openai,
            "anthropic" => &self.provider.anthropic,
            "ollama" => &self.provider.ollama,
            "openrouter" => &self.provider.openrouter,
            _ => &None,
        };
        entry.as_ref()
    }

    /// Names of all configured profiles, sorted.
    pub fn profile_names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    /// Name of the profile used when none is requested explicitly.
    pub fn current_profile_name(&self) -> &str {
        self.current_profile.as_deref().unwrap_or(DEFAULT_PROFILE)
    }

    /// Resolves the requested (or current) profile and validates it.
    ///
    /// An unknown name falls back to the built-in default profile with a
    /// warning; an invalid profile is an error.
    pub fn profile(&self, requested: Option<&str>) -> Result<Profile> {
        let name = requested.unwrap_or_else(|| self.current_profile_name());
        let profile = match self.profiles.get(name) {
            Some(profile) => Profile {
                profile_name: name.to_string(),
                ..profile.clone()
            },
            None => {
                tracing::warn!(profile = name, "profile not found, using default profile");
                Profile::default()
            }
        };
        profile.validate()?;
        Ok(profile)
    }
}
