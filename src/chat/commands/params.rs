//! `:param`: inspect or set a generation parameter on the live profile.

use colored::Colorize;

use super::{match_prefix, CommandError, PrefixMatch, NO_ALIASES};
use crate::config::{ParamError, ParamName};
use crate::conversation::Conversation;

/// Resolves a parameter name by exact match or unambiguous prefix.
pub(super) fn match_param(input: &str) -> Result<ParamName, ParamError> {
    let entries = ParamName::ALL.map(|p| (p.as_str(), NO_ALIASES, p));
    match match_prefix(input, &entries) {
        PrefixMatch::Found(name) => Ok(name),
        PrefixMatch::Ambiguous(candidates) => Err(ParamError::Ambiguous {
            input: input.to_string(),
            candidates: candidates.join(", "),
        }),
        PrefixMatch::NoMatch => Err(ParamError::Unknown(input.to_string())),
    }
}

/// `:param` → usage, `:param <name>` → show, `:param <name> <value>` → set.
pub(super) fn run(args: &[&str], conversation: &mut Conversation) -> Result<(), CommandError> {
    let Some(input) = args.first() else {
        print!("{}", usage());
        return Ok(());
    };
    let name = match_param(input)?;
    let parameters = &mut conversation.profile_mut().parameters;

    match args.get(1) {
        None => {
            let value = parameters
                .display_value(name)
                .unwrap_or_else(|| "API default".to_string());
            println!("{}: {}", name.as_str().cyan(), value);
        }
        Some(_) => {
            let value = args[1..].join(" ");
            parameters.set(name, &value)?;
            tracing::debug!(param = name.as_str(), value = %value, "parameter updated");
            let shown = parameters
                .display_value(name)
                .unwrap_or_else(|| "API default".to_string());
            println!("{} {} = {}", "set".dimmed(), name.as_str().cyan(), shown);
        }
    }
    Ok(())
}

pub(super) fn usage() -> String {
    let mut out = String::from("Usage: :param <name> [value | clear]\n\nParameters:\n");
    for name in ParamName::ALL {
        let note = match name {
            ParamName::Temperature => "0.0 to 2.0",
            ParamName::TopP => "0.0 to 1.0",
            ParamName::Stop => "up to 4 comma-separated sequences",
            ParamName::MaxTokens => "non-negative integer",
            ParamName::PresencePenalty | ParamName::FrequencyPenalty => "-2.0 to 2.0",
            ParamName::LogitBias => "read-only, set it in the profile",
        };
        out.push_str(&format!("  {:<18} {}\n", name.as_str(), note));
    }
    out
}
