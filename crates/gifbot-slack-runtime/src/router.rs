//! Routes inbound chat messages to store operations and replies.

use anyhow::{Context, Result};
use gifbot_store::{GifStore, ManifestFile, WILDCARD};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

use crate::commands::{
    is_mention, is_trigger, parse_admin_command, parse_mention_command, AdminCommand,
    MentionCommand,
};
use crate::config::GifBotConfig;
use crate::render;
use crate::transport::ChatTransport;

#[derive(Debug, Clone, PartialEq, Eq)]
/// A user message, stripped of transport details.
pub struct InboundMessage {
    pub user_id: String,
    pub channel_id: String,
    /// Slack's `channel_type` (`im`, `channel`, ...), when the event carried one.
    pub channel_type: Option<String>,
    pub text: String,
    pub ts: String,
}

impl InboundMessage {
    pub fn is_direct_message(&self) -> bool {
        self.channel_type.as_deref() == Some("im") || self.channel_id.starts_with('D')
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub bot_user_id: String,
    pub bot_name: String,
    pub owner_user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrasing {
    pub nouns: Vec<String>,
    pub greetings: Vec<String>,
    pub triggers: Vec<String>,
    pub reactions: Vec<String>,
}

impl Phrasing {
    pub fn from_config(config: &GifBotConfig) -> Self {
        Self {
            nouns: config.nouns.clone(),
            greetings: config.greetings.clone(),
            triggers: config.triggers.clone(),
            reactions: config.reactions.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Ignored,
    Admin(AdminCommand),
    Mention(MentionCommand),
    Trigger,
}

/// Owns the gif catalog and answers messages against it.
pub struct GifBotRouter {
    store: GifStore,
    manifest: ManifestFile,
    identity: BotIdentity,
    phrasing: Phrasing,
    status_max_tags: usize,
    rng: StdRng,
}

impl GifBotRouter {
    pub fn new(
        store: GifStore,
        manifest: ManifestFile,
        identity: BotIdentity,
        phrasing: Phrasing,
        status_max_tags: usize,
    ) -> Self {
        Self {
            store,
            manifest,
            identity,
            phrasing,
            status_max_tags,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Replaces the random source with a deterministic one.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn store(&self) -> &GifStore {
        &self.store
    }

    pub fn identity(&self) -> &BotIdentity {
        &self.identity
    }

    pub async fn handle_message<T>(
        &mut self,
        message: &InboundMessage,
        transport: &T,
    ) -> Result<RouteOutcome>
    where
        T: ChatTransport + ?Sized,
    {
        if message.user_id == self.identity.bot_user_id {
            return Ok(RouteOutcome::Ignored);
        }

        if message.user_id == self.identity.owner_user_id && message.is_direct_message() {
            let command = parse_admin_command(&message.text);
            tracing::info!(channel = %message.channel_id, ?command, "handling admin command");
            self.handle_admin_command(&command, message, transport)
                .await?;
            return Ok(RouteOutcome::Admin(command));
        }

        if is_mention(
            &message.text,
            &self.identity.bot_user_id,
            &self.identity.bot_name,
        ) {
            let Some(command) = parse_mention_command(&message.text) else {
                return Ok(RouteOutcome::Ignored);
            };
            tracing::info!(channel = %message.channel_id, ?command, "handling mention");
            self.handle_mention_command(&command, message, transport)
                .await?;
            return Ok(RouteOutcome::Mention(command));
        }

        if is_trigger(&message.text, &self.phrasing.triggers) {
            tracing::info!(channel = %message.channel_id, "handling trigger");
            self.post_gif(message, WILDCARD, transport).await?;
            return Ok(RouteOutcome::Trigger);
        }

        Ok(RouteOutcome::Ignored)
    }

    async fn handle_admin_command<T>(
        &mut self,
        command: &AdminCommand,
        message: &InboundMessage,
        transport: &T,
    ) -> Result<()>
    where
        T: ChatTransport + ?Sized,
    {
        let channel = message.channel_id.as_str();
        match command {
            AdminCommand::Add { url, tags } if tags.is_empty() => {
                reply(transport, channel, &render::add_needs_tags(url)).await
            }
            AdminCommand::Add { url, tags } => {
                self.store.add(url.clone(), tags.iter().cloned());
                reply(transport, channel, &render::added(url)).await
            }
            AdminCommand::Remove { url } => {
                if !self.store.remove(url) {
                    tracing::debug!(url = %url, "remove requested for unknown url");
                }
                reply(transport, channel, &render::removed(url)).await
            }
            AdminCommand::Status => {
                let report = self.store.report_with(self.status_max_tags, &mut self.rng);
                reply(transport, channel, &report.to_string()).await
            }
            AdminCommand::Compare { expressions } => {
                let comparison = self.store.compare(expressions);
                reply(transport, channel, &render::comparison(&comparison)).await
            }
            AdminCommand::Request { expression } => {
                let expression = expression.as_deref().unwrap_or(WILDCARD);
                self.post_gif(message, expression, transport).await
            }
            AdminCommand::Reload => {
                let text = match self.manifest.load(self.store.modifiers().to_vec()) {
                    Ok((store, _summary)) => {
                        self.store = store;
                        "Manifest reloaded".to_string()
                    }
                    Err(error) => {
                        tracing::warn!(%error, "manifest reload failed; keeping current catalog");
                        format!("Unable to reload the manifest: {error}")
                    }
                };
                reply(transport, channel, &text).await
            }
            AdminCommand::Save => {
                let text = match self.manifest.save(&self.store) {
                    Ok(()) => "Manifest saved".to_string(),
                    Err(error) => {
                        tracing::warn!(%error, "manifest save failed");
                        format!("Unable to save the manifest: {error}")
                    }
                };
                reply(transport, channel, &text).await
            }
            AdminCommand::Unknown => reply(transport, channel, &render::admin_usage()).await,
        }
    }

    async fn handle_mention_command<T>(
        &mut self,
        command: &MentionCommand,
        message: &InboundMessage,
        transport: &T,
    ) -> Result<()>
    where
        T: ChatTransport + ?Sized,
    {
        let channel = message.channel_id.as_str();
        match command {
            MentionCommand::Help => reply(transport, channel, &render::mention_help()).await,
            MentionCommand::About => {
                reply(transport, channel, &render::about(&self.identity.bot_name)).await
            }
            MentionCommand::Status => {
                let report = self.store.report_with(self.status_max_tags, &mut self.rng);
                reply(transport, channel, &report.to_string()).await
            }
            MentionCommand::Request { expression } => {
                let expression = expression.as_deref().unwrap_or(WILDCARD);
                self.post_gif(message, expression, transport).await
            }
            MentionCommand::Compare { expressions } => {
                let comparison = self.store.compare(expressions);
                reply(transport, channel, &render::comparison(&comparison)).await
            }
            MentionCommand::Unknown => {
                let hint = render::mention_hint(&self.identity.bot_name);
                reply(transport, channel, &hint).await
            }
        }
    }

    /// Posts a random gif matching `expression` (or an apology) and reacts to
    /// the triggering message accordingly.
    async fn post_gif<T>(
        &mut self,
        message: &InboundMessage,
        expression: &str,
        transport: &T,
    ) -> Result<()>
    where
        T: ChatTransport + ?Sized,
    {
        let found = self
            .store
            .lookup_with(expression, &mut self.rng)
            .map(str::to_string);
        tracing::info!(expression, found = found.is_some(), "retrieving gif");

        let (text, reaction) = match found {
            Some(url) => {
                let noun = self
                    .phrasing
                    .nouns
                    .choose(&mut self.rng)
                    .map(String::as_str)
                    .unwrap_or_default();
                let greeting = self
                    .phrasing
                    .greetings
                    .choose(&mut self.rng)
                    .map(|template| render::greeting(template, noun))
                    .unwrap_or_default();
                let reaction = self
                    .phrasing
                    .reactions
                    .choose(&mut self.rng)
                    .cloned()
                    .unwrap_or_else(|| render::MISSING_GIF_REACTION.to_string());
                (render::gif_reply(&greeting, &url), reaction)
            }
            None => (
                render::missing_gif(expression),
                render::MISSING_GIF_REACTION.to_string(),
            ),
        };

        reply(transport, &message.channel_id, &text).await?;
        if let Err(error) = transport
            .add_reaction(&message.channel_id, &message.ts, &reaction)
            .await
        {
            tracing::warn!(
                channel = %message.channel_id,
                ts = %message.ts,
                reaction = %reaction,
                %error,
                "failed to add reaction"
            );
        }
        Ok(())
    }
}

async fn reply<T>(transport: &T, channel: &str, text: &str) -> Result<()>
where
    T: ChatTransport + ?Sized,
{
    transport
        .post_message(channel, text)
        .await
        .with_context(|| format!("failed to post reply to channel {channel}"))
}
