//! Opening a conversation: restoring a saved one or seeding a fresh one.

use anyhow::Result;

use crate::cli::SessionArgs;
use crate::config::{Config, Profile};
use crate::conversation::{store, Conversation};
use crate::files::{self, IngestedFile};
use crate::message::Role;

/// Fresh conversation: system prompt, then one user message per file, then
/// the profile's preset messages.
pub(crate) fn seed_conversation(profile: Profile, files: &[IngestedFile]) -> Conversation {
    let system = profile.system_context.clone();
    let presets = profile.messages.clone();
    let mut conversation = Conversation::new(profile);
    conversation.set_system(system);
    for file in files {
        conversation.append(Role::User, file.to_message());
    }
    for preset in presets {
        conversation.append(preset.role, preset.content);
    }
    conversation
}

/// Restores `--restore` when given, otherwise seeds from the profile and
/// `--file` patterns.
pub(crate) fn open_conversation(config: &Config, args: &SessionArgs) -> Result<Conversation> {
    let Some(name) = args.restore.as_deref() else {
        let profile = config.profile(args.profile.as_deref())?;
        let files = files::ingest(&args.files);
        return Ok(seed_conversation(profile, &files));
    };

    if args.profile.is_some() {
        tracing::warn!("--profile is ignored when restoring a conversation");
    }
    if !args.files.is_empty() {
        tracing::warn!("--file patterns are ignored when restoring a conversation");
    }
    let conversation = store::restore(name)?;
    tracing::info!(
        file = conversation.file_name().unwrap_or(name),
        messages = conversation.messages().len(),
        "restored conversation"
    );
    Ok(conversation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PresetMessage;
    use std::path::PathBuf;

    #[test]
    fn seeding_order_is_files_then_presets() {
        let profile = Profile {
            system_context: "be terse".to_string(),
            messages: vec![
                PresetMessage {
                    role: Role::User,
                    content: "Remember: answer in English.".to_string(),
                },
                PresetMessage {
                    role: Role::Assistant,
                    content: "Understood.".to_string(),
                },
            ],
            ..Default::default()
        };
        let files = [IngestedFile {
            path: PathBuf::from("main.rs"),
            contents: "fn main() {}".to_string(),
        }];

        let conv = seed_conversation(profile, &files);
        assert_eq!(conv.system(), "be terse");
        let path = conv.path_from_head().unwrap();
        let roles: Vec<_> = path.iter().map(|m| m.role).collect();
        assert_eq!(roles, [Role::User, Role::User, Role::Assistant]);
        assert!(path[0].content.starts_with("Path: `main.rs`"));
        assert_eq!(path[2].content, "Understood.");
        assert_eq!(conv.head().unwrap().content, "Understood.");
    }

    #[test]
    fn empty_profile_seeds_nothing_but_the_system_prompt() {
        let conv = seed_conversation(Profile::default(), &[]);
        assert!(conv.is_empty());
        assert!(conv.head().is_none());
        assert_eq!(conv.system(), Profile::default().system_context);
    }
}
