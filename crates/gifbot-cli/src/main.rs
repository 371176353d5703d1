mod bootstrap_helpers;
mod cli_args;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use gifbot_slack_runtime::{run_gif_bot, GifBotConfig, GifBotRuntimeConfig};
use gifbot_store::ManifestFile;

use crate::bootstrap_helpers::init_tracing;
use crate::cli_args::Cli;

fn resolve_bot_config(cli: &Cli) -> Result<GifBotConfig> {
    let mut bot = GifBotConfig::load(&cli.config)?;
    if let Some(manifest) = &cli.manifest {
        bot.manifest_path = manifest.clone();
    }
    if let Some(api_base) = cli
        .slack_api_base
        .as_deref()
        .map(|value| value.trim().trim_end_matches('/'))
        .filter(|value| !value.is_empty())
    {
        bot.api_base = api_base.to_string();
    }
    Ok(bot)
}

fn require_secret(value: Option<&str>, flag: &str, env: &str) -> Result<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("{flag} (or {env}) is required to connect to slack"))
}

fn render_manifest_status(bot: &GifBotConfig, max_tags: usize) -> Result<String> {
    let manifest = ManifestFile::new(&bot.manifest_path);
    let (store, summary) = manifest.load(bot.adjectives.clone())?;
    Ok(format!(
        "manifest {}: records={} tags={} skipped_lines={}\n{}",
        manifest.path().display(),
        summary.records,
        summary.tags,
        summary.skipped_lines,
        store.report(max_tags)
    ))
}

async fn run_cli(cli: Cli) -> Result<()> {
    let bot = resolve_bot_config(&cli)
        .with_context(|| format!("failed to prepare bot config from {}", cli.config.display()))?;

    if let Some(max_tags) = cli.manifest_status {
        let status = render_manifest_status(&bot, max_tags.unwrap_or(bot.status_max_tags))?;
        println!("{status}");
        return Ok(());
    }

    let app_token = require_secret(
        cli.slack_app_token.as_deref(),
        "--slack-app-token",
        "GIFBOT_SLACK_APP_TOKEN",
    )?;
    let bot_token = require_secret(
        cli.slack_bot_token.as_deref(),
        "--slack-bot-token",
        "GIFBOT_SLACK_BOT_TOKEN",
    )?;

    run_gif_bot(GifBotRuntimeConfig {
        bot,
        app_token,
        bot_token,
        bot_user_id: cli.slack_bot_user_id,
        owner_user_id: cli.slack_owner_user_id,
    })
    .await
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run_cli(cli).await
}
