//! Socket Mode connection loop: connect, acknowledge, route, reconnect.

use anyhow::{bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use gifbot_store::ManifestFile;
use serde_json::json;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

use crate::backoff::ReconnectBackoff;
use crate::config::GifBotConfig;
use crate::router::{BotIdentity, GifBotRouter, Phrasing};
use crate::slack_api_client::SlackApiClient;
use crate::slack_events::{
    current_unix_timestamp_ms, event_is_stale, normalize_socket_envelope, parse_socket_envelope,
    ProcessedEventIndex, SlackSocketEnvelope,
};

#[derive(Debug, Clone)]
/// Everything needed to start the bot: the parsed config file plus secrets and
/// optional pre-resolved user ids.
pub struct GifBotRuntimeConfig {
    pub bot: GifBotConfig,
    pub app_token: String,
    pub bot_token: String,
    /// Skips `auth.test` when set.
    pub bot_user_id: Option<String>,
    /// Skips the `users.list` owner lookup when set.
    pub owner_user_id: Option<String>,
}

pub async fn run_gif_bot(config: GifBotRuntimeConfig) -> Result<()> {
    let mut runtime = GifBotRuntime::new(config).await?;
    runtime.run().await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// The websocket closed or ended. `ready` is set once `hello` arrived.
    Closed { ready: bool },
    /// Slack asked us to reconnect.
    Disconnect,
    Shutdown,
}

/// A socket that closes before `hello` counts as a failed connection attempt.
fn failure_streak_after(failure_streak: usize, end: SessionEnd) -> usize {
    match end {
        SessionEnd::Closed { ready: false } => failure_streak.saturating_add(1),
        _ => 0,
    }
}

struct GifBotRuntime {
    slack_client: SlackApiClient,
    router: GifBotRouter,
    processed: ProcessedEventIndex,
    backoff: ReconnectBackoff,
    max_event_age_seconds: u64,
}

fn preset_id(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl GifBotRuntime {
    async fn new(config: GifBotRuntimeConfig) -> Result<Self> {
        if config.app_token.trim().is_empty() {
            bail!("slack app token is required for socket mode");
        }
        if config.bot_token.trim().is_empty() {
            bail!("slack bot token is required");
        }
        let bot = config.bot;

        let manifest = ManifestFile::new(&bot.manifest_path);
        let (store, _summary) = manifest
            .load(bot.adjectives.clone())
            .context("unable to load gif manifest")?;

        let slack_client = SlackApiClient::new(
            &bot.api_base,
            &config.app_token,
            &config.bot_token,
            bot.request_timeout_ms,
            bot.retry_policy(),
        )?;

        let bot_user_id = match preset_id(config.bot_user_id) {
            Some(user_id) => user_id,
            None => slack_client.resolve_bot_user_id().await?,
        };
        let owner_user_id = match preset_id(config.owner_user_id) {
            Some(user_id) => user_id,
            None => slack_client
                .resolve_user_id_by_name(&bot.bot_owner)
                .await
                .with_context(|| format!("unable to resolve bot owner '{}'", bot.bot_owner))?,
        };
        tracing::info!(
            bot_user_id = %bot_user_id,
            owner_user_id = %owner_user_id,
            "gif bot initialised"
        );

        let router = GifBotRouter::new(
            store,
            manifest,
            BotIdentity {
                bot_user_id,
                bot_name: bot.bot_name.clone(),
                owner_user_id,
            },
            Phrasing::from_config(&bot),
            bot.status_max_tags,
        );

        Ok(Self {
            slack_client,
            router,
            processed: ProcessedEventIndex::new(bot.processed_event_cap),
            backoff: bot.reconnect_backoff(),
            max_event_age_seconds: bot.max_event_age_seconds,
        })
    }

    async fn run(&mut self) -> Result<()> {
        let mut failure_streak = 0_usize;
        loop {
            let session = match self.slack_client.open_socket_connection().await {
                Ok(socket_url) => {
                    tracing::info!("slack socket connecting");
                    self.run_socket_session(&socket_url).await
                }
                Err(error) => Err(error),
            };

            match session {
                Ok(SessionEnd::Shutdown) => {
                    tracing::info!("gif bot shutdown requested");
                    return Ok(());
                }
                Ok(SessionEnd::Disconnect) => {
                    failure_streak = 0;
                    tracing::info!("slack requested a reconnect");
                    continue;
                }
                Ok(end @ SessionEnd::Closed { ready: true }) => {
                    failure_streak = failure_streak_after(failure_streak, end);
                    tracing::info!("slack socket closed");
                }
                Ok(end @ SessionEnd::Closed { ready: false }) => {
                    failure_streak = failure_streak_after(failure_streak, end);
                    tracing::warn!(failure_streak, "slack socket closed before hello");
                    if self.backoff.is_exhausted(failure_streak) {
                        bail!("giving up after {failure_streak} consecutive slack connection failures: socket closed before hello");
                    }
                }
                Err(error) => {
                    failure_streak = failure_streak.saturating_add(1);
                    tracing::warn!(failure_streak, error = %format!("{error:#}"), "slack connection failed");
                    if self.backoff.is_exhausted(failure_streak) {
                        bail!("giving up after {failure_streak} consecutive slack connection failures: {error:#}");
                    }
                }
            }

            let delay = self.backoff.delay_for(failure_streak.max(1));
            tracing::info!(delay_ms = delay.as_millis() as u64, "reconnecting to slack");
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("gif bot shutdown requested");
                    return Ok(());
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn run_socket_session(&mut self, socket_url: &str) -> Result<SessionEnd> {
        let (stream, _response) = connect_async(socket_url)
            .await
            .context("failed to connect slack socket mode websocket")?;
        let (mut sink, mut source) = stream.split();
        let mut ready = false;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    return Ok(SessionEnd::Shutdown);
                }
                maybe_message = source.next() => {
                    let Some(message_result) = maybe_message else {
                        return Ok(SessionEnd::Closed { ready });
                    };
                    let message = message_result.context("failed reading slack websocket message")?;
                    if matches!(message, WsMessage::Close(_)) {
                        return Ok(SessionEnd::Closed { ready });
                    }
                    let envelope = match parse_socket_envelope(message) {
                        Ok(Some(envelope)) => envelope,
                        Ok(None) => continue,
                        Err(error) => {
                            tracing::warn!(error = %format!("{error:#}"), "dropping unreadable socket frame");
                            continue;
                        }
                    };
                    if let Some(envelope_id) = envelope.envelope_id.as_deref() {
                        ack_envelope(&mut sink, envelope_id).await?;
                    }
                    match envelope.envelope_type.as_str() {
                        "hello" => {
                            ready = true;
                            tracing::info!("slack socket ready");
                        }
                        "disconnect" => return Ok(SessionEnd::Disconnect),
                        "events_api" => self.handle_events_api(&envelope).await,
                        other => tracing::debug!(envelope_type = other, "ignoring socket envelope"),
                    }
                }
            }
        }
    }

    async fn handle_events_api(&mut self, envelope: &SlackSocketEnvelope) {
        let event = match normalize_socket_envelope(envelope) {
            Ok(Some(event)) => event,
            Ok(None) => return,
            Err(error) => {
                tracing::warn!(error = %format!("{error:#}"), "dropping malformed slack event");
                return;
            }
        };

        if self.processed.contains(&event.key) {
            tracing::debug!(key = %event.key, "skipping duplicate slack event");
            return;
        }
        self.processed.mark_processed(&event.key);
        if event_is_stale(
            &event,
            self.max_event_age_seconds,
            current_unix_timestamp_ms(),
        ) {
            tracing::debug!(key = %event.key, "skipping stale slack event");
            return;
        }

        if let Err(error) = self
            .router
            .handle_message(&event.message, &self.slack_client)
            .await
        {
            tracing::warn!(
                channel = %event.message.channel_id,
                error = %format!("{error:#}"),
                "failed to handle slack message"
            );
        }
    }
}

async fn ack_envelope<S>(sink: &mut S, envelope_id: &str) -> Result<()>
where
    S: futures_util::Sink<WsMessage> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    let ack = json!({ "envelope_id": envelope_id }).to_string();
    sink.send(WsMessage::Text(ack.into()))
        .await
        .context("failed to send slack socket ack")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use httpmock::prelude::*;
    use serde_json::json;
    use tempfile::tempdir;

    use super::{failure_streak_after, GifBotRuntime, GifBotRuntimeConfig, SessionEnd};
    use crate::backoff::ReconnectBackoff;
    use crate::config::GifBotConfig;
    use crate::slack_events::{current_unix_timestamp_ms, SlackSocketEnvelope};

    fn bot_config(api_base: &str, manifest_path: &std::path::Path) -> GifBotConfig {
        GifBotConfig::from_json_str(
            &json!({
                "bot_name": "gifbot",
                "bot_owner": "owner",
                "manifest_path": manifest_path,
                "greetings": "Hi {}!",
                "nouns": "pal",
                "triggers": "sad",
                "reactions": "heart",
                "api_base": api_base,
                "retry_max_attempts": 1,
                "retry_base_delay_ms": 1,
            })
            .to_string(),
        )
        .expect("bot config")
    }

    fn message_envelope(event_id: &str, text: &str) -> SlackSocketEnvelope {
        SlackSocketEnvelope {
            envelope_id: Some(format!("env-{event_id}")),
            envelope_type: "events_api".to_string(),
            payload: json!({
                "type": "event_callback",
                "event_id": event_id,
                "event_time": current_unix_timestamp_ms() / 1000,
                "event": {
                    "type": "message",
                    "user": "UALICE",
                    "channel": "C1",
                    "channel_type": "channel",
                    "text": text,
                    "ts": "1700000000.000100"
                }
            }),
        }
    }

    #[tokio::test]
    async fn integration_runtime_resolves_identities_and_answers_trigger_once() {
        let server = MockServer::start();
        let auth = server.mock(|when, then| {
            when.method(POST).path("/auth.test");
            then.status(200)
                .json_body(json!({"ok": true, "user_id": "UBOT"}));
        });
        let users = server.mock(|when, then| {
            when.method(GET).path("/users.list");
            then.status(200).json_body(json!({
                "ok": true,
                "members": [{"id": "UOWNER", "name": "owner"}]
            }));
        });
        let post = server.mock(|when, then| {
            when.method(POST)
                .path("/chat.postMessage")
                .body_includes("\"channel\":\"C1\"")
                .body_includes("Hi pal! https://x.test/cat.gif");
            then.status(200)
                .json_body(json!({"ok": true, "channel": "C1", "ts": "2.0"}));
        });
        let react = server.mock(|when, then| {
            when.method(POST)
                .path("/reactions.add")
                .body_includes("\"name\":\"heart\"");
            then.status(200).json_body(json!({"ok": true}));
        });

        let temp = tempdir().expect("tempdir");
        let manifest_path = temp.path().join("manifest.csv");
        std::fs::write(&manifest_path, "https://x.test/cat.gif,cat\n").expect("manifest");

        let mut runtime = GifBotRuntime::new(GifBotRuntimeConfig {
            bot: bot_config(&server.base_url(), &manifest_path),
            app_token: "xapp-test".to_string(),
            bot_token: "xoxb-test".to_string(),
            bot_user_id: None,
            owner_user_id: None,
        })
        .await
        .expect("runtime");
        assert_eq!(runtime.router.identity().bot_user_id, "UBOT");
        assert_eq!(runtime.router.identity().owner_user_id, "UOWNER");

        let envelope = message_envelope("Ev1", "feeling sad");
        runtime.handle_events_api(&envelope).await;
        runtime.handle_events_api(&envelope).await;

        auth.assert();
        users.assert();
        assert_eq!(post.calls(), 1);
        assert_eq!(react.calls(), 1);
    }

    #[tokio::test]
    async fn regression_runtime_skips_stale_events_and_preset_ids_skip_lookups() {
        let server = MockServer::start();
        let post = server.mock(|when, then| {
            when.method(POST).path("/chat.postMessage");
            then.status(200)
                .json_body(json!({"ok": true, "channel": "C1", "ts": "2.0"}));
        });

        let temp = tempdir().expect("tempdir");
        let manifest_path = temp.path().join("manifest.csv");
        std::fs::write(&manifest_path, "https://x.test/cat.gif,cat\n").expect("manifest");

        let mut runtime = GifBotRuntime::new(GifBotRuntimeConfig {
            bot: bot_config(&server.base_url(), &manifest_path),
            app_token: "xapp-test".to_string(),
            bot_token: "xoxb-test".to_string(),
            bot_user_id: Some("UBOT".to_string()),
            owner_user_id: Some("UOWNER".to_string()),
        })
        .await
        .expect("runtime without identity lookups");

        let mut stale = message_envelope("Ev-old", "sad");
        stale.payload["event_time"] = json!(1_000_u64);
        runtime.handle_events_api(&stale).await;

        assert_eq!(post.calls(), 0);
    }

    #[test]
    fn regression_socket_closing_before_hello_grows_the_failure_streak() {
        let backoff = ReconnectBackoff {
            base: Duration::from_millis(100),
            step: Duration::from_millis(100),
            max: Duration::from_secs(1),
            max_failures: 3,
        };
        let mut streak = 0;
        for expected in 1..=3 {
            streak = failure_streak_after(streak, SessionEnd::Closed { ready: false });
            assert_eq!(streak, expected);
        }
        assert!(backoff.delay_for(streak) > backoff.delay_for(1));
        assert!(backoff.is_exhausted(streak));

        assert_eq!(failure_streak_after(streak, SessionEnd::Closed { ready: true }), 0);
        assert_eq!(failure_streak_after(streak, SessionEnd::Disconnect), 0);
    }

    #[tokio::test]
    async fn regression_runtime_requires_tokens_and_manifest() {
        let temp = tempdir().expect("tempdir");
        let manifest_path = temp.path().join("missing.csv");
        let bot = bot_config("http://127.0.0.1:9", &manifest_path);

        let missing_token = GifBotRuntime::new(GifBotRuntimeConfig {
            bot: bot.clone(),
            app_token: " ".to_string(),
            bot_token: "xoxb-test".to_string(),
            bot_user_id: Some("UBOT".to_string()),
            owner_user_id: Some("UOWNER".to_string()),
        })
        .await;
        assert!(missing_token.is_err());

        let missing_manifest = GifBotRuntime::new(GifBotRuntimeConfig {
            bot,
            app_token: "xapp-test".to_string(),
            bot_token: "xoxb-test".to_string(),
            bot_user_id: Some("UBOT".to_string()),
            owner_user_id: Some("UOWNER".to_string()),
        })
        .await;
        let error = missing_manifest.err().expect("manifest error");
        assert!(format!("{error:#}").contains("unable to load gif manifest"));
    }
}
