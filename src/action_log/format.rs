//! Text form of an action log
//!
//! ```text
//! // <title>
//! // free-form comment
//! GROUP Clone Schemas
//! CREATE 5f1d...
//! UPDATE 5f2e... 3 4
//! SUCCESS
//! ```

use super::{actions, ActionLog, LogErrorLevel, LogGroup, LogLine, DEFAULT_GROUP};
use log::warn;

const COMMENT_PREFIX: &str = "//";
const GROUP_PREFIX: &str = "GROUP ";

/// Number of space-separated payload fields a known action carries.
/// Unknown actions accept any payload.
pub fn action_arity(action: &str) -> Option<usize> {
    match action {
        actions::CREATE
        | actions::MOVED
        | actions::ARCHIVE
        | actions::UNARCHIVE
        | actions::DELETE => Some(1),
        actions::UPDATE => Some(3),
        _ => None,
    }
}

pub(super) fn render(title: &str, groups: &[LogGroup], level: LogErrorLevel) -> String {
    let mut out = format!("{} {}\n", COMMENT_PREFIX, title);

    for group in groups.iter().filter(|g| !g.lines.is_empty()) {
        if group.name != DEFAULT_GROUP {
            out.push_str(GROUP_PREFIX);
            out.push_str(&group.name);
            out.push('\n');
        }
        for line in &group.lines {
            match line {
                LogLine::Action { action, data } if data.is_empty() => {
                    out.push_str(action);
                }
                LogLine::Action { action, data } => {
                    out.push_str(action);
                    out.push(' ');
                    out.push_str(data);
                }
                LogLine::Comment(text) | LogLine::Plain(text) => {
                    out.push_str(COMMENT_PREFIX);
                    out.push(' ');
                    out.push_str(text);
                }
            }
            out.push('\n');
        }
    }

    out.push_str(level.token());
    out.push('\n');
    out
}

/// Rebuild a log from its text form. Comments and blank lines are dropped;
/// action lines with the wrong number of fields are skipped so a truncated
/// or hand-edited log can still drive a revert.
pub fn parse_log(text: &str) -> ActionLog {
    let mut lines = text.lines().peekable();

    let title = match lines.peek() {
        Some(first) if first.starts_with(COMMENT_PREFIX) => {
            let title = first[COMMENT_PREFIX.len()..].trim().to_string();
            lines.next();
            title
        }
        _ => String::new(),
    };

    let log = ActionLog::new(title);
    let mut level = LogErrorLevel::None;

    for (index, raw) in lines.enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(COMMENT_PREFIX) {
            continue;
        }

        if let Some(name) = line.strip_prefix(GROUP_PREFIX) {
            log.switch_group(name.trim());
            continue;
        }

        if let Some(terminal) = LogErrorLevel::from_token(line) {
            level = terminal;
            continue;
        }

        let mut fields = line.split_whitespace();
        let Some(action) = fields.next() else {
            continue;
        };
        let payload: Vec<&str> = fields.collect();

        if let Some(expected) = action_arity(action) {
            if payload.len() != expected {
                warn!(
                    "Skipping malformed log line {}: '{}' (expected {} fields, found {})",
                    index + 2,
                    line,
                    expected,
                    payload.len()
                );
                continue;
            }
        }

        log.add_action(action, payload.join(" "));
    }

    log.set_error_level(level);
    log
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_and_parse_keep_groups() {
        let log = ActionLog::new("Hub clone");
        log.add_comment("started");
        log.switch_group("Clone Schemas");
        log.add_action(actions::CREATE, "s1");
        log.switch_group("Clone Content");
        log.append_line("Importing 2 items");
        log.add_action(actions::UPDATE, "i1 1 2");
        log.warn("one item skipped");

        let text = log.to_string();
        assert!(text.starts_with("// Hub clone\n"));
        assert!(text.contains("GROUP Clone Schemas\nCREATE s1\n"));
        assert!(text.ends_with("WARNING\n"));

        let reloaded = parse_log(&text);
        assert_eq!(reloaded.title(), "Hub clone");
        assert_eq!(reloaded.get_data(actions::CREATE, Some("Clone Schemas")), vec!["s1"]);
        assert_eq!(reloaded.get_data(actions::UPDATE, Some("Clone Content")), vec!["i1 1 2"]);
        assert_eq!(reloaded.error_level(), LogErrorLevel::Warning);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let text = concat!(
            "// title\n",
            "UPDATE id9 0 1 invalid\nUPDATE id8 1 2\n",
            "CREATE\nCREATE a b\nCREATE ok\n",
        );
        let log = parse_log(text);

        assert_eq!(log.get_data(actions::UPDATE, None), vec!["id8 1 2"]);
        assert_eq!(log.get_data(actions::CREATE, None), vec!["ok"]);
    }

    #[test]
    fn test_missing_terminal_token_means_none() {
        let log = parse_log("// title\nCREATE a\n");
        assert_eq!(log.error_level(), LogErrorLevel::None);

        let log = parse_log("// title\nCREATE a\nFAILURE\n");
        assert_eq!(log.error_level(), LogErrorLevel::Error);
    }

    #[test]
    fn test_unknown_actions_are_kept() {
        let log = parse_log("// t\n\nPUBLISH a b c\n");
        assert_eq!(log.get_data("PUBLISH", None), vec!["a b c"]);
    }
}
