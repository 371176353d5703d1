//! Owner direct-message commands, mention commands and trigger detection.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Add { url: String, tags: Vec<String> },
    Remove { url: String },
    Status,
    Compare { expressions: Vec<String> },
    Request { expression: Option<String> },
    Reload,
    Save,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MentionCommand {
    Help,
    About,
    Status,
    Request { expression: Option<String> },
    Compare { expressions: Vec<String> },
    Unknown,
}

/// Unwraps Slack link markup: `<https://x>` and `<https://x|label>` both
/// become `https://x`. Anything else is returned unchanged.
pub fn strip_slack_link(token: &str) -> &str {
    let Some(inner) = token
        .strip_prefix('<')
        .and_then(|rest| rest.strip_suffix('>'))
    else {
        return token;
    };
    inner.split_once('|').map_or(inner, |(target, _)| target)
}

fn owned(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|token| (*token).to_string()).collect()
}

pub fn parse_admin_command(text: &str) -> AdminCommand {
    let tokens = text.split_whitespace().collect::<Vec<_>>();
    match tokens.as_slice() {
        ["add", url, tags @ ..] => AdminCommand::Add {
            url: strip_slack_link(url).to_string(),
            tags: owned(tags),
        },
        ["remove", url] => AdminCommand::Remove {
            url: strip_slack_link(url).to_string(),
        },
        ["status", ..] => AdminCommand::Status,
        ["compare", expressions @ ..] if !expressions.is_empty() => AdminCommand::Compare {
            expressions: owned(expressions),
        },
        ["request"] => AdminCommand::Request { expression: None },
        ["request", expression, ..] => AdminCommand::Request {
            expression: Some((*expression).to_string()),
        },
        ["reload", ..] => AdminCommand::Reload,
        ["save", ..] => AdminCommand::Save,
        _ => AdminCommand::Unknown,
    }
}

/// Parses the words after the leading mention. Returns `None` for a bare
/// mention with nothing after it.
pub fn parse_mention_command(text: &str) -> Option<MentionCommand> {
    let lowered = text.to_lowercase();
    let tokens = lowered.split_whitespace().skip(1).collect::<Vec<_>>();
    let command = match tokens.as_slice() {
        [] => return None,
        ["help", ..] => MentionCommand::Help,
        ["about", ..] => MentionCommand::About,
        ["status", ..] => MentionCommand::Status,
        ["request"] => MentionCommand::Request { expression: None },
        ["request", expression, ..] => MentionCommand::Request {
            expression: Some((*expression).to_string()),
        },
        ["compare", expressions @ ..] if !expressions.is_empty() => MentionCommand::Compare {
            expressions: owned(expressions),
        },
        _ => MentionCommand::Unknown,
    };
    Some(command)
}

/// True when the first word addresses the bot, either as a Slack user
/// mention (`<@UBOT>`) or as a plain `@bot_name`.
pub fn is_mention(text: &str, bot_user_id: &str, bot_name: &str) -> bool {
    let Some(first) = text.split_whitespace().next() else {
        return false;
    };
    (!bot_user_id.is_empty() && first.starts_with(&format!("<@{bot_user_id}>")))
        || (!bot_name.is_empty() && first.contains(&format!("@{bot_name}")))
}

pub fn is_trigger(text: &str, triggers: &[String]) -> bool {
    let lowered = text.to_lowercase();
    triggers
        .iter()
        .any(|trigger| lowered.contains(&trigger.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::{
        is_mention, is_trigger, parse_admin_command, parse_mention_command, strip_slack_link,
        AdminCommand, MentionCommand,
    };

    #[test]
    fn unit_strip_slack_link_handles_plain_and_labelled_links() {
        assert_eq!(strip_slack_link("<https://x.test/a.gif>"), "https://x.test/a.gif");
        assert_eq!(
            strip_slack_link("<https://x.test/a.gif|x.test/a.gif>"),
            "https://x.test/a.gif"
        );
        assert_eq!(strip_slack_link("https://x.test/a.gif"), "https://x.test/a.gif");
        assert_eq!(strip_slack_link("<unterminated"), "<unterminated");
    }

    #[test]
    fn functional_parse_admin_command_covers_every_verb() {
        assert_eq!(
            parse_admin_command("add <https://x.test/cat.gif> cat  cute"),
            AdminCommand::Add {
                url: "https://x.test/cat.gif".to_string(),
                tags: vec!["cat".to_string(), "cute".to_string()],
            }
        );
        assert_eq!(
            parse_admin_command("add u"),
            AdminCommand::Add {
                url: "u".to_string(),
                tags: Vec::new(),
            }
        );
        assert_eq!(
            parse_admin_command("remove <u|label>"),
            AdminCommand::Remove {
                url: "u".to_string()
            }
        );
        assert_eq!(parse_admin_command("status please"), AdminCommand::Status);
        assert_eq!(
            parse_admin_command("compare cat dog+cat"),
            AdminCommand::Compare {
                expressions: vec!["cat".to_string(), "dog+cat".to_string()],
            }
        );
        assert_eq!(
            parse_admin_command("request"),
            AdminCommand::Request { expression: None }
        );
        assert_eq!(
            parse_admin_command("request cat+dog extra"),
            AdminCommand::Request {
                expression: Some("cat+dog".to_string())
            }
        );
        assert_eq!(parse_admin_command("reload"), AdminCommand::Reload);
        assert_eq!(parse_admin_command("  save  "), AdminCommand::Save);
    }

    #[test]
    fn regression_admin_commands_with_wrong_arity_are_unknown() {
        assert_eq!(parse_admin_command("add"), AdminCommand::Unknown);
        assert_eq!(parse_admin_command("remove"), AdminCommand::Unknown);
        assert_eq!(parse_admin_command("remove a b"), AdminCommand::Unknown);
        assert_eq!(parse_admin_command("compare"), AdminCommand::Unknown);
        assert_eq!(parse_admin_command(""), AdminCommand::Unknown);
        assert_eq!(parse_admin_command("Status"), AdminCommand::Unknown);
    }

    #[test]
    fn functional_parse_mention_command_lowercases_and_skips_mention() {
        assert_eq!(parse_mention_command("<@UBOT>"), None);
        assert_eq!(
            parse_mention_command("<@UBOT> HELP"),
            Some(MentionCommand::Help)
        );
        assert_eq!(
            parse_mention_command("@gifbot about"),
            Some(MentionCommand::About)
        );
        assert_eq!(
            parse_mention_command("@gifbot status"),
            Some(MentionCommand::Status)
        );
        assert_eq!(
            parse_mention_command("@gifbot request Cat"),
            Some(MentionCommand::Request {
                expression: Some("cat".to_string())
            })
        );
        assert_eq!(
            parse_mention_command("@gifbot request"),
            Some(MentionCommand::Request { expression: None })
        );
        assert_eq!(
            parse_mention_command("@gifbot compare cat dog"),
            Some(MentionCommand::Compare {
                expressions: vec!["cat".to_string(), "dog".to_string()],
            })
        );
        assert_eq!(
            parse_mention_command("@gifbot compare"),
            Some(MentionCommand::Unknown)
        );
        assert_eq!(
            parse_mention_command("@gifbot dance"),
            Some(MentionCommand::Unknown)
        );
    }

    #[test]
    fn unit_is_mention_checks_only_the_first_word() {
        assert!(is_mention("<@UBOT> help", "UBOT", "gifbot"));
        assert!(is_mention("<@UBOT>: help", "UBOT", "gifbot"));
        assert!(is_mention("@gifbot help", "UBOT", "gifbot"));
        assert!(!is_mention("hey <@UBOT>", "UBOT", "gifbot"));
        assert!(!is_mention("", "UBOT", "gifbot"));
        assert!(!is_mention("<@UOTHER> help", "UBOT", "gifbot"));
    }

    #[test]
    fn unit_is_trigger_is_case_insensitive_substring_match() {
        let triggers = vec!["Sad".to_string(), "help me".to_string()];
        assert!(is_trigger("I am so SAD today", &triggers));
        assert!(is_trigger("please help me", &triggers));
        assert!(is_trigger("saddest", &triggers));
        assert!(!is_trigger("happy", &triggers));
        assert!(!is_trigger("sad", &[]));
    }
}
