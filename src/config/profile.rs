//! Profiles: the named bundle of vendor, model, user name, generation
//! parameters and auto-save policy that drives one conversation.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_MODEL, DEFAULT_PROFILE, DEFAULT_PROVIDER, DEFAULT_SYSTEM_PROMPT, DEFAULT_USER_NAME,
    MAX_STOP_SEQUENCES,
};
use crate::message::Role;
use crate::provider::ProviderKind;

/// A conversation profile, stored in `config.toml` under `[profiles.<name>]`
/// and embedded in every saved conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub profile_name: String,
    pub user_name: String,
    pub vendor: String,
    pub model: String,
    pub system_context: String,
    pub auto_save: bool,
    pub parameters: Parameters,
    /// Messages appended to every fresh conversation, after ingested files.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<PresetMessage>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            profile_name: DEFAULT_PROFILE.to_string(),
            user_name: DEFAULT_USER_NAME.to_string(),
            vendor: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_context: DEFAULT_SYSTEM_PROMPT.to_string(),
            auto_save: true,
            parameters: Parameters::default(),
            messages: Vec::new(),
        }
    }
}

/// A canned user or assistant turn seeded into new conversations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetMessage {
    pub role: Role,
    pub content: String,
}

impl Profile {
    /// Checks the vendor, preset roles and parameter ranges.
    pub fn validate(&self) -> Result<()> {
        ProviderKind::from_str(&self.vendor)
            .with_context(|| format!("invalid vendor in profile '{}'", self.profile_name))?;
        if let Some(preset) = self.messages.iter().find(|m| m.role == Role::System) {
            bail!(
                "profile '{}' has a preset message with role {}; only user and assistant are allowed",
                self.profile_name,
                preset.role
            );
        }
        self.parameters
            .validate()
            .with_context(|| format!("invalid parameters in profile '{}'", self.profile_name))?;
        Ok(())
    }
}

/// Generation parameters forwarded to the provider.
///
/// Zero / empty values mean "use the API default" and are not sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub temperature: f32,
    pub top_p: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    pub max_tokens: u64,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub logit_bias: BTreeMap<String, i32>,
}

/// Names of the tunable generation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamName {
    Temperature,
    TopP,
    Stop,
    MaxTokens,
    PresencePenalty,
    FrequencyPenalty,
    LogitBias,
}

impl ParamName {
    pub const ALL: [ParamName; 7] = [
        ParamName::Temperature,
        ParamName::TopP,
        ParamName::Stop,
        ParamName::MaxTokens,
        ParamName::PresencePenalty,
        ParamName::FrequencyPenalty,
        ParamName::LogitBias,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamName::Temperature => "temperature",
            ParamName::TopP => "top_p",
            ParamName::Stop => "stop",
            ParamName::MaxTokens => "max_tokens",
            ParamName::PresencePenalty => "presence_penalty",
            ParamName::FrequencyPenalty => "frequency_penalty",
            ParamName::LogitBias => "logit_bias",
        }
    }

    fn range(&self) -> Option<(f32, f32)> {
        match self {
            ParamName::Temperature => Some((0.0, 2.0)),
            ParamName::TopP => Some((0.0, 1.0)),
            ParamName::PresencePenalty | ParamName::FrequencyPenalty => Some((-2.0, 2.0)),
            _ => None,
        }
    }
}

/// Failure to parse, match, or validate a generation parameter.
#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    #[error("unknown parameter: {0}")]
    Unknown(String),
    #[error("ambiguous parameter name: {input} (could be {candidates})")]
    Ambiguous { input: String, candidates: String },
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("too many stop values provided ({count}), maximum {max} allowed")]
    TooManyStops { count: usize, max: usize },
    #[error("{0} can only be set via the profile")]
    ReadOnly(&'static str),
}

impl Parameters {
    /// Range-checks every parameter.
    pub fn validate(&self) -> Result<(), ParamError> {
        for (name, value) in [
            (ParamName::Temperature, self.temperature),
            (ParamName::TopP, self.top_p),
            (ParamName::PresencePenalty, self.presence_penalty),
            (ParamName::FrequencyPenalty, self.frequency_penalty),
        ] {
            check_range(name, value)?;
        }
        if self.stop.len() > MAX_STOP_SEQUENCES {
            return Err(ParamError::TooManyStops {
                count: self.stop.len(),
                max: MAX_STOP_SEQUENCES,
            });
        }
        Ok(())
    }

    /// Parses `value` into `name` and validates the result.
    ///
    /// `clear` resets the parameter to its API default. On any error `self`
    /// is left untouched.
    pub fn set(&mut self, name: ParamName, value: &str) -> Result<(), ParamError> {
        let mut next = self.clone();
        let clear = value.eq_ignore_ascii_case("clear");
        match name {
            ParamName::Temperature => next.temperature = parse_f32(name, value, clear)?,
            ParamName::TopP => next.top_p = parse_f32(name, value, clear)?,
            ParamName::PresencePenalty => next.presence_penalty = parse_f32(name, value, clear)?,
            ParamName::FrequencyPenalty => next.frequency_penalty = parse_f32(name, value, clear)?,
            ParamName::MaxTokens => {
                next.max_tokens = if clear {
                    0
                } else {
                    value.parse().map_err(|_| ParamError::Invalid {
                        name: name.as_str(),
                        value: value.to_string(),
                    })?
                }
            }
            ParamName::Stop => {
                next.stop = if clear || value.is_empty() {
                    Vec::new()
                } else {
                    value.split(',').map(str::to_string).collect()
                }
            }
            ParamName::LogitBias => return Err(ParamError::ReadOnly(name.as_str())),
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Human-readable current value, or `None` when the API default applies.
    pub fn display_value(&self, name: ParamName) -> Option<String> {
        let float = |v: f32| (v != 0.0).then(|| format!("{v:.2}"));
        match name {
            ParamName::Temperature => float(self.temperature),
            ParamName::TopP => float(self.top_p),
            ParamName::PresencePenalty => float(self.presence_penalty),
            ParamName::FrequencyPenalty => float(self.frequency_penalty),
            ParamName::MaxTokens => (self.max_tokens != 0).then(|| self.max_tokens.to_string()),
            ParamName::Stop => (!self.stop.is_empty()).then(|| format!("{:?}", self.stop)),
            ParamName::LogitBias => {
                (!self.logit_bias.is_empty()).then(|| format!("{:?}", self.logit_bias))
            }
        }
    }
}

fn parse_f32(name: ParamName, value: &str, clear: bool) -> Result<f32, ParamError> {
    if clear {
        return Ok(0.0);
    }
    value.parse::<f32>().map_err(|_| ParamError::Invalid {
        name: name.as_str(),
        value: value.to_string(),
    })
}

fn check_range(name: ParamName, value: f32) -> Result<(), ParamError> {
    let Some((min, max)) = name.range() else {
        return Ok(());
    };
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ParamError::OutOfRange {
            name: name.as_str(),
            value,
            min,
            max,
        })
    }
}
