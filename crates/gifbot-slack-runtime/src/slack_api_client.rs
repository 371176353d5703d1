//! Slack Web API client used for identity lookups, Socket Mode handshakes and
//! posting replies.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::backoff::{parse_retry_after, RetryPolicy};
use crate::transport::ChatTransport;

const RETRY_ATTEMPT_HEADER: &str = "x-gifbot-retry-attempt";
const USERS_LIST_PAGE_SIZE: &str = "200";

#[derive(Debug, Clone, Deserialize)]
struct SlackAuthTestResponse {
    ok: bool,
    user_id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackOpenSocketResponse {
    ok: bool,
    url: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackChatMessageResponse {
    ok: bool,
    ts: Option<String>,
    channel: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackBasicResponse {
    ok: bool,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackUser {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    deleted: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SlackResponseMetadata {
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackUsersListResponse {
    ok: bool,
    #[serde(default)]
    members: Vec<SlackUser>,
    #[serde(default)]
    response_metadata: SlackResponseMetadata,
    error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackPostedMessage {
    pub channel: String,
    pub ts: String,
}

fn ensure_ok(operation: &str, ok: bool, error: Option<String>) -> Result<()> {
    if ok {
        return Ok(());
    }
    bail!(
        "slack {operation} failed: {}",
        error.unwrap_or_else(|| "unknown error".to_string())
    )
}

fn truncate_for_error(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut truncated = value.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}

#[derive(Clone)]
pub struct SlackApiClient {
    http: reqwest::Client,
    api_base: String,
    app_token: String,
    bot_token: String,
    retry: RetryPolicy,
}

impl SlackApiClient {
    pub fn new(
        api_base: &str,
        app_token: &str,
        bot_token: &str,
        request_timeout_ms: u64,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("gifbot-slack-runtime"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create slack api client")?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            app_token: app_token.trim().to_string(),
            bot_token: bot_token.trim().to_string(),
            retry,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{method}", self.api_base)
    }

    /// Resolves the bot's own user id via `auth.test`.
    pub async fn resolve_bot_user_id(&self) -> Result<String> {
        let response: SlackAuthTestResponse = self
            .request_json("auth.test", || {
                self.http
                    .post(self.endpoint("auth.test"))
                    .bearer_auth(&self.bot_token)
            })
            .await?;
        ensure_ok("auth.test", response.ok, response.error)?;
        response
            .user_id
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("slack auth.test did not return user_id"))
    }

    /// Finds the id of the active workspace member called `user_name`,
    /// following `users.list` pagination.
    pub async fn resolve_user_id_by_name(&self, user_name: &str) -> Result<String> {
        let mut cursor = String::new();
        loop {
            let response: SlackUsersListResponse = self
                .request_json("users.list", || {
                    let mut query = vec![("limit", USERS_LIST_PAGE_SIZE)];
                    if !cursor.is_empty() {
                        query.push(("cursor", cursor.as_str()));
                    }
                    self.http
                        .get(self.endpoint("users.list"))
                        .bearer_auth(&self.bot_token)
                        .query(&query)
                })
                .await?;
            ensure_ok("users.list", response.ok, response.error)?;

            if let Some(user) = response
                .members
                .iter()
                .find(|user| !user.deleted && user.name.as_deref() == Some(user_name))
            {
                return Ok(user.id.clone());
            }

            match response
                .response_metadata
                .next_cursor
                .filter(|next| !next.trim().is_empty())
            {
                Some(next) => cursor = next,
                None => bail!("unable to find a slack user named '{user_name}'"),
            }
        }
    }

    /// Requests a fresh Socket Mode websocket url.
    pub async fn open_socket_connection(&self) -> Result<String> {
        let response: SlackOpenSocketResponse = self
            .request_json("apps.connections.open", || {
                self.http
                    .post(self.endpoint("apps.connections.open"))
                    .bearer_auth(&self.app_token)
            })
            .await?;
        ensure_ok("apps.connections.open", response.ok, response.error)?;
        response
            .url
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("slack apps.connections.open did not return url"))
    }

    pub async fn post_chat_message(&self, channel: &str, text: &str) -> Result<SlackPostedMessage> {
        let payload = json!({
            "channel": channel,
            "text": text,
            "unfurl_links": true,
            "unfurl_media": true,
        });
        let response: SlackChatMessageResponse = self
            .request_json("chat.postMessage", || {
                self.http
                    .post(self.endpoint("chat.postMessage"))
                    .bearer_auth(&self.bot_token)
                    .json(&payload)
            })
            .await?;
        ensure_ok("chat.postMessage", response.ok, response.error)?;
        Ok(SlackPostedMessage {
            channel: response.channel.unwrap_or_else(|| channel.to_string()),
            ts: response
                .ts
                .ok_or_else(|| anyhow!("slack chat.postMessage response missing ts"))?,
        })
    }

    /// Adds a reaction; a reaction that is already present counts as success.
    pub async fn add_message_reaction(&self, channel: &str, ts: &str, name: &str) -> Result<()> {
        let payload = json!({
            "channel": channel,
            "timestamp": ts,
            "name": name.trim_matches(':'),
        });
        let response: SlackBasicResponse = self
            .request_json("reactions.add", || {
                self.http
                    .post(self.endpoint("reactions.add"))
                    .bearer_auth(&self.bot_token)
                    .json(&payload)
            })
            .await?;
        if response.error.as_deref() == Some("already_reacted") {
            return Ok(());
        }
        ensure_ok("reactions.add", response.ok, response.error)
    }

    async fn request_json<T, F>(&self, operation: &str, mut builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = builder()
                .header(RETRY_ATTEMPT_HEADER, attempt.saturating_sub(1).to_string())
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<T>()
                            .await
                            .with_context(|| format!("failed to decode slack {operation}"));
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if self.retry.allows_another_attempt(attempt)
                        && RetryPolicy::is_retryable_status(status.as_u16())
                    {
                        let delay = self.retry.delay_for(attempt, retry_after);
                        tracing::debug!(
                            operation,
                            status = status.as_u16(),
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "retrying slack api call"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    bail!(
                        "slack api {operation} failed with status {}: {}",
                        status.as_u16(),
                        truncate_for_error(&body, 800)
                    );
                }
                Err(error) => {
                    if self.retry.allows_another_attempt(attempt)
                        && RetryPolicy::is_retryable_transport_error(&error)
                    {
                        tokio::time::sleep(self.retry.delay_for(attempt, None)).await;
                        continue;
                    }
                    return Err(error)
                        .with_context(|| format!("slack api {operation} request failed"));
                }
            }
        }
    }
}

#[async_trait]
impl ChatTransport for SlackApiClient {
    async fn post_message(&self, channel: &str, text: &str) -> Result<()> {
        self.post_chat_message(channel, text).await.map(|_| ())
    }

    async fn add_reaction(&self, channel: &str, ts: &str, reaction: &str) -> Result<()> {
        self.add_message_reaction(channel, ts, reaction).await
    }
}
