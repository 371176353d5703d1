//! Reply text rendering.

use gifbot_store::TagComparison;

pub const MISSING_GIF_REACTION: &str = "broken_heart";

pub fn admin_usage() -> String {
    [
        "Sorry, I don't understand that command.",
        "Supported commands:",
        "  `add url token1 token2...`",
        "  `remove url`",
        "  `status`",
        "  `request cat`",
        "  `compare cat dog alpaca`",
        "  `reload`",
        "  `save`",
    ]
    .join("\n")
}

pub fn mention_help() -> String {
    [
        "Hi! I know the following commands:",
        "  `help` : Display this message",
        "  `about` : Display info about me",
        "  `status` : Give a status report of the bot",
        "  `request cat` : Request a cat GIF",
        "  `compare cat dog` : Compare the number of GIFs I know about",
    ]
    .join("\n")
}

pub fn about(bot_name: &str) -> String {
    format!(
        "I'm {bot_name}, a wholesome bot that shares gifs from a hand-curated collection. \
         Mention me with `help` to see what I can do."
    )
}

pub fn mention_hint(bot_name: &str) -> String {
    format!("Sorry, I don't understand that!\n(HINT: try `@{bot_name} help` to see a list of suitable commands)")
}

pub fn added(url: &str) -> String {
    format!("Adding {url}\nType `save` to save this to the manifest.")
}

pub fn add_needs_tags(url: &str) -> String {
    format!("Not adding {url}: give it at least one tag, e.g. `add {url} cat`")
}

pub fn removed(url: &str) -> String {
    format!("Removing {url}")
}

/// Fills the first `{}` placeholder of a greeting with `noun`.
pub fn greeting(template: &str, noun: &str) -> String {
    template.replacen("{}", noun, 1)
}

pub fn gif_reply(greeting: &str, url: &str) -> String {
    if greeting.is_empty() {
        return url.to_string();
    }
    format!("{greeting} {url}")
}

pub fn missing_gif(expression: &str) -> String {
    format!("Sorry, I have no gifs of type `{expression}` :weary:")
}

fn winner_phrase(winners: &[String]) -> String {
    match winners {
        [] => "neither of them".to_string(),
        [single] => single.clone(),
        [first, rest @ ..] => {
            let mut phrase = format!("both {first}");
            for winner in rest {
                phrase.push_str(" and ");
                phrase.push_str(winner);
            }
            phrase
        }
    }
}

pub fn comparison(comparison: &TagComparison) -> String {
    let mut text = String::from("Current GIF counts:\n```");
    for (expression, count) in &comparison.counts {
        text.push_str(&format!("  {expression} : {count}\n"));
    }
    text.push_str(&format!(
        "```\nThe winner is.... {}!",
        winner_phrase(&comparison.winners)
    ));
    text
}
