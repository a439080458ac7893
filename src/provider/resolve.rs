//! Model resolution for ramify.
//!
//! Resolves which vendor and model to use based on CLI flags and the active
//! profile. Supports `provider/model` shorthand syntax.

use anyhow::Result;

use super::kind::{default_model_for, ProviderKind};
use crate::config::Profile;

/// Resolved provider + model pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSelection {
    pub provider: ProviderKind,
    pub model: String,
}

/// Resolve which provider and model to use.
/// Priority: CLI flags > profile > defaults.
///
/// Accepts these formats:
///   --model anthropic/claude-sonnet-4-5  (provider/model shorthand, only when --provider is omitted)
///   --provider openrouter --model "org/model-name"  (slash preserved as model name)
///   --provider openai  (the profile's model when the profile uses that vendor, else the vendor default)
///   (nothing)  (the profile's vendor and model)
pub fn resolve_model(
    cli_provider: Option<&str>,
    cli_model: Option<&str>,
    profile: &Profile,
) -> Result<ModelSelection> {
    if cli_provider.is_none() {
        if let Some((prov, model)) = cli_model.and_then(|m| m.split_once('/')) {
            return Ok(ModelSelection {
                provider: ProviderKind::from_str(prov)?,
                model: model.to_string(),
            });
        }
    }

    let profile_kind = ProviderKind::from_str(&profile.vendor)?;
    let provider = match cli_provider {
        Some(name) => ProviderKind::from_str(name)?,
        None => profile_kind,
    };

    let model = match cli_model {
        Some(model) => model.to_string(),
        None if provider == profile_kind && !profile.model.is_empty() => profile.model.clone(),
        None => default_model_for(&provider).to_string(),
    };

    Ok(ModelSelection { provider, model })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(vendor: &str, model: &str) -> Profile {
        Profile {
            vendor: vendor.to_string(),
            model: model.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn profile_drives_selection_by_default() {
        let sel = resolve_model(None, None, &profile("openai", "gpt-4o")).unwrap();
        assert_eq!(sel.provider, ProviderKind::OpenAI);
        assert_eq!(sel.model, "gpt-4o");
    }

    #[test]
    fn shorthand_overrides_profile() {
        let sel = resolve_model(None, Some("ollama/mistral"), &profile("anthropic", "x")).unwrap();
        assert_eq!(sel.provider, ProviderKind::Ollama);
        assert_eq!(sel.model, "mistral");
    }

    #[test]
    fn explicit_provider_keeps_slash_in_model() {
        let sel = resolve_model(
            Some("openrouter"),
            Some("org/model-name"),
            &Profile::default(),
        )
        .unwrap();
        assert_eq!(sel.provider, ProviderKind::OpenRouter);
        assert_eq!(sel.model, "org/model-name");
    }

    #[test]
    fn switching_vendor_uses_vendor_default_model() {
        let sel = resolve_model(Some("ollama"), None, &profile("anthropic", "claude-x")).unwrap();
        assert_eq!(sel.model, crate::constants::OLLAMA_DEFAULT_MODEL);
    }

    #[test]
    fn unknown_vendor_is_an_error() {
        assert!(resolve_model(Some("acme"), None, &Profile::default()).is_err());
    }
}
