use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "gifbot",
    about = "Slack bot that answers trigger words and mentions with tagged gifs",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long,
        env = "GIFBOT_CONFIG",
        default_value = "gifbot.json",
        help = "Path to the JSON bot configuration file"
    )]
    pub(crate) config: PathBuf,

    #[arg(
        long,
        env = "GIFBOT_MANIFEST",
        help = "Override the manifest_path from the configuration file"
    )]
    pub(crate) manifest: Option<PathBuf>,

    #[arg(
        long = "slack-app-token",
        env = "GIFBOT_SLACK_APP_TOKEN",
        hide_env_values = true,
        help = "Slack Socket Mode app token (xapp-...)"
    )]
    pub(crate) slack_app_token: Option<String>,

    #[arg(
        long = "slack-bot-token",
        env = "GIFBOT_SLACK_BOT_TOKEN",
        hide_env_values = true,
        help = "Slack bot token for Web API calls (xoxb-...)"
    )]
    pub(crate) slack_bot_token: Option<String>,

    #[arg(
        long = "slack-api-base",
        env = "GIFBOT_SLACK_API_BASE",
        help = "Override the Slack Web API base URL from the configuration file"
    )]
    pub(crate) slack_api_base: Option<String>,

    #[arg(
        long = "slack-bot-user-id",
        env = "GIFBOT_SLACK_BOT_USER_ID",
        help = "Bot user id; skips the auth.test lookup when set"
    )]
    pub(crate) slack_bot_user_id: Option<String>,

    #[arg(
        long = "slack-owner-user-id",
        env = "GIFBOT_SLACK_OWNER_USER_ID",
        help = "Owner user id; skips resolving bot_owner through users.list when set"
    )]
    pub(crate) slack_owner_user_id: Option<String>,

    #[arg(
        long = "manifest-status",
        num_args = 0..=1,
        value_name = "MAX_TAGS",
        help = "Load the manifest, print a status report covering at most MAX_TAGS tags (0 = all; defaults to status_max_tags) and exit"
    )]
    pub(crate) manifest_status: Option<Option<usize>>,
}
