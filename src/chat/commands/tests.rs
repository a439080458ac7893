use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use super::*;
use crate::config::{ParamName, Profile};
use crate::constants::ROOT_ID;

/// Returns canned editor results in order and records the seeds it saw.
#[derive(Default)]
struct ScriptedEditor {
    replies: RefCell<VecDeque<String>>,
    seeds: RefCell<Vec<String>>,
}

impl ScriptedEditor {
    fn replying(replies: &[&str]) -> Self {
        Self {
            replies: RefCell::new(replies.iter().map(|r| r.to_string()).collect()),
            ..Default::default()
        }
    }
}

impl TextEditor for ScriptedEditor {
    fn edit(&self, seed: &str) -> Result<String, EditorError> {
        self.seeds.borrow_mut().push(seed.to_string());
        Ok(self.replies.borrow_mut().pop_front().unwrap_or_default())
    }
}

fn no_open(_: &Path) -> io::Result<()> {
    Ok(())
}

fn run(input: &str, conv: &mut Conversation, editor: &ScriptedEditor) -> Result<CommandAction, CommandError> {
    let ctx = CommandContext {
        editor,
        config_dir: Path::new("/tmp/ramify-config"),
        open_dir: &no_open,
    };
    execute(input, conv, &ctx)
}

fn chat() -> Conversation {
    let mut conv = Conversation::new(Profile::default());
    conv.set_system("sys");
    conv.append(Role::User, "q1");
    conv.append(Role::Assistant, "a1");
    conv
}

#[test]
fn prefix_dispatch_rules() {
    match match_command("e") {
        Err(CommandError::Ambiguous { candidates, .. }) => {
            assert!(candidates.contains(":editor"));
            assert!(candidates.contains(":exit"));
        }
        other => panic!("expected ambiguity, got {other:?}"),
    }
    assert_eq!(match_command("ed").unwrap(), CommandKind::Editor);
    assert_eq!(match_command("exit").unwrap(), CommandKind::Exit);
    assert_eq!(match_command("q").unwrap(), CommandKind::Exit);
    assert_eq!(match_command("quit").unwrap(), CommandKind::Exit);
    assert_eq!(match_command("hel").unwrap(), CommandKind::Help);
    assert_eq!(match_command("his").unwrap(), CommandKind::History);
    assert!(matches!(match_command("h"), Err(CommandError::Ambiguous { .. })));
    assert!(matches!(match_command("m"), Err(CommandError::Ambiguous { .. })));
}

#[test]
fn unknown_command_lists_the_table() {
    let err = match_command("frobnicate").unwrap_err();
    let text = err.to_string();
    assert!(text.starts_with("unknown command: :frobnicate"));
    for command in COMMANDS {
        assert!(text.contains(command.usage), "missing {}", command.usage);
    }
    assert!(matches!(match_command(""), Err(CommandError::Unknown { .. })));
}

#[test]
fn exit_is_distinct_from_errors() {
    let mut conv = chat();
    let editor = ScriptedEditor::default();
    assert!(matches!(run(":q", &mut conv, &editor), Err(CommandError::ShouldExit)));
    assert!(matches!(run(":exit", &mut conv, &editor), Err(CommandError::ShouldExit)));
}

#[test]
fn move_changes_head_without_new_messages() {
    let mut conv = chat();
    let editor = ScriptedEditor::default();
    let q1 = conv.messages()[0].id.clone();

    assert_eq!(run(&format!(":move {}", &q1[..6]), &mut conv, &editor).unwrap(), CommandAction::Handled);
    assert_eq!(conv.head().unwrap().id, q1);
    assert_eq!(conv.messages().len(), 2);

    run(":move ROOT", &mut conv, &editor).unwrap();
    assert!(conv.head().is_none());
}

#[test]
fn move_with_unknown_prefix_keeps_head() {
    let mut conv = chat();
    let editor = ScriptedEditor::default();
    let head = conv.head().unwrap().id.clone();

    assert!(matches!(
        run(":move nothere", &mut conv, &editor),
        Err(CommandError::Chain(ChainError::NotFound(_)))
    ));
    assert!(matches!(run(":move", &mut conv, &editor), Err(CommandError::Usage(_))));
    assert_eq!(conv.head().unwrap().id, head);
}

#[test]
fn compose_appends_cleaned_text() {
    let mut conv = chat();
    let editor = ScriptedEditor::replying(&["\n  new question  \n# Save and close editor to continue\n#   a1\n"]);

    assert_eq!(run(":editor", &mut conv, &editor).unwrap(), CommandAction::Retrieve);
    let head = conv.head().unwrap();
    assert_eq!(head.content, "new question");
    assert_eq!(head.role, Role::User);

    let seeds = editor.seeds.borrow();
    assert!(seeds[0].starts_with("\n\n# Save and close editor to continue\n"));
    assert!(seeds[0].contains("#   a1"));
}

#[test]
fn empty_compose_is_a_no_op() {
    let mut conv = chat();
    let head = conv.head().unwrap().id.clone();
    let editor = ScriptedEditor::replying(&["# only comments\n\n"]);

    assert_eq!(run(":ed", &mut conv, &editor).unwrap(), CommandAction::Handled);
    assert_eq!(conv.messages().len(), 2);
    assert_eq!(conv.head().unwrap().id, head);
}

#[test]
fn editing_latest_turn_branches_from_its_parent() {
    let mut conv = chat();
    let q1 = conv.messages()[0].clone();
    let editor = ScriptedEditor::replying(&["q1 rephrased"]);

    assert_eq!(run(":editor latest", &mut conv, &editor).unwrap(), CommandAction::Retrieve);
    let head = conv.head().unwrap();
    assert_eq!(head.content, "q1 rephrased");
    assert_eq!(head.parent_id, ROOT_ID);
    assert_eq!(conv.messages().len(), 3);
    assert_eq!(conv.messages()[0], Message { head: false, ..q1.clone() });
    assert!(editor.seeds.borrow()[0].starts_with("q1\n\n"));
}

#[test]
fn unchanged_edit_does_not_branch() {
    let mut conv = chat();
    let editor = ScriptedEditor::replying(&["  q1 \n"]);
    assert_eq!(run(":editor latest", &mut conv, &editor).unwrap(), CommandAction::Handled);
    assert_eq!(conv.messages().len(), 2);
}

#[test]
fn editor_rejects_assistant_targets() {
    let mut conv = chat();
    let a1 = conv.messages()[1].id.clone();
    let editor = ScriptedEditor::replying(&["x"]);
    assert!(matches!(
        run(&format!(":editor {a1}"), &mut conv, &editor),
        Err(CommandError::NotUserMessage(_))
    ));
    assert!(editor.seeds.borrow().is_empty());

    conv.change_head(ROOT_ID).unwrap();
    assert!(matches!(
        run(":editor latest", &mut conv, &editor),
        Err(CommandError::NoUserMessage)
    ));
}

#[test]
fn modify_keeps_identity_and_head() {
    let mut conv = chat();
    let q1 = conv.messages()[0].id.clone();
    let head = conv.head().unwrap().id.clone();
    let editor = ScriptedEditor::replying(&["q1 fixed\n# comment"]);

    assert_eq!(run(&format!(":modify {}", &q1[..6]), &mut conv, &editor).unwrap(), CommandAction::Handled);
    assert_eq!(conv.messages()[0].content, "q1 fixed");
    assert_eq!(conv.messages()[0].id, q1);
    assert_eq!(conv.head().unwrap().id, head);
    assert!(matches!(run(":modify", &mut conv, &editor), Err(CommandError::Usage(_))));
}

#[test]
fn param_set_and_validation() {
    let mut conv = chat();
    let editor = ScriptedEditor::default();

    run(":param temp 1.2", &mut conv, &editor).unwrap();
    assert_eq!(conv.profile().parameters.temperature, 1.2);

    run(":param stop END,STOP", &mut conv, &editor).unwrap();
    let err = run(":param stop a,b,c,d,e", &mut conv, &editor).unwrap_err();
    assert!(err.to_string().contains("too many"));
    assert_eq!(conv.profile().parameters.stop, vec!["END", "STOP"]);

    assert!(matches!(
        run(":param t 1", &mut conv, &editor),
        Err(CommandError::Param(ParamError::Ambiguous { .. }))
    ));
    assert!(matches!(
        run(":param bogus 1", &mut conv, &editor),
        Err(CommandError::Param(ParamError::Unknown(_)))
    ));
    assert!(matches!(
        run(":param logit 1", &mut conv, &editor),
        Err(CommandError::Param(ParamError::ReadOnly(_)))
    ));

    run(":param top_p", &mut conv, &editor).unwrap();
    run(":param", &mut conv, &editor).unwrap();
    assert_eq!(conv.profile().parameters.top_p, 0.0);
}

#[test]
fn param_names_match_by_prefix() {
    assert_eq!(params::match_param("top").unwrap(), ParamName::TopP);
    assert_eq!(params::match_param("max").unwrap(), ParamName::MaxTokens);
    assert_eq!(params::match_param("stop").unwrap(), ParamName::Stop);
    assert!(params::usage().contains("frequency_penalty"));
}

#[test]
fn config_opens_the_config_directory() {
    let mut conv = chat();
    let editor = ScriptedEditor::default();
    let opened = Cell::new(false);
    let open = |path: &Path| -> io::Result<()> {
        assert_eq!(path, Path::new("/tmp/ramify-config"));
        opened.set(true);
        Ok(())
    };
    let ctx = CommandContext {
        editor: &editor,
        config_dir: Path::new("/tmp/ramify-config"),
        open_dir: &open,
    };
    assert_eq!(execute(":config", &mut conv, &ctx).unwrap(), CommandAction::Handled);
    assert!(opened.get());
}
