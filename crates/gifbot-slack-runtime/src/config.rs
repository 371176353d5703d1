//! Bot configuration file: identities, manifest location, phrasing lists and
//! connection knobs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::backoff::{ReconnectBackoff, RetryPolicy};

pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";
const DEFAULT_NOUN: &str = "friend";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read bot config '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse bot config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("required key '{0}' was not found in the bot config")]
    MissingKey(&'static str),
    #[error("bot config key '{key}' {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum StringList {
    One(String),
    Many(Vec<String>),
}

impl StringList {
    fn normalize(value: Option<Self>) -> Vec<String> {
        let values = match value {
            None => Vec::new(),
            Some(Self::One(value)) => vec![value],
            Some(Self::Many(values)) => values,
        };
        values
            .into_iter()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct GifBotConfigFile {
    bot_name: Option<String>,
    bot_owner: Option<String>,
    manifest_path: Option<PathBuf>,
    nouns: Option<StringList>,
    greetings: Option<StringList>,
    triggers: Option<StringList>,
    reactions: Option<StringList>,
    adjectives: Option<StringList>,
    api_base: Option<String>,
    request_timeout_ms: Option<u64>,
    retry_max_attempts: Option<usize>,
    retry_base_delay_ms: Option<u64>,
    reconnect_base_delay_ms: Option<u64>,
    reconnect_step_ms: Option<u64>,
    reconnect_max_delay_ms: Option<u64>,
    reconnect_max_failures: Option<usize>,
    status_max_tags: Option<usize>,
    processed_event_cap: Option<usize>,
    max_event_age_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Validated bot configuration. Every phrasing list is already normalised to
/// trimmed, non-empty strings.
pub struct GifBotConfig {
    pub bot_name: String,
    pub bot_owner: String,
    pub manifest_path: PathBuf,
    pub nouns: Vec<String>,
    pub greetings: Vec<String>,
    pub triggers: Vec<String>,
    pub reactions: Vec<String>,
    pub adjectives: Vec<String>,
    pub api_base: String,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
    pub reconnect_base_delay_ms: u64,
    pub reconnect_step_ms: u64,
    pub reconnect_max_delay_ms: u64,
    /// Consecutive connection failures tolerated before giving up; 0 never gives up.
    pub reconnect_max_failures: usize,
    pub status_max_tags: usize,
    pub processed_event_cap: usize,
    pub max_event_age_seconds: u64,
}

fn required_text(value: Option<String>, key: &'static str) -> Result<String, ConfigError> {
    let value = value.ok_or(ConfigError::MissingKey(key))?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid {
            key,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn required_list(
    value: Option<StringList>,
    key: &'static str,
) -> Result<Vec<String>, ConfigError> {
    if value.is_none() {
        return Err(ConfigError::MissingKey(key));
    }
    let values = StringList::normalize(value);
    if values.is_empty() {
        return Err(ConfigError::Invalid {
            key,
            reason: "must contain at least one entry".to_string(),
        });
    }
    Ok(values)
}

impl GifBotConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let file = serde_json::from_str::<GifBotConfigFile>(raw)?;
        Self::from_file(file)
    }

    fn from_file(file: GifBotConfigFile) -> Result<Self, ConfigError> {
        let bot_name = required_text(file.bot_name, "bot_name")?;
        let bot_owner = required_text(file.bot_owner, "bot_owner")?;
        let manifest_path = file
            .manifest_path
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or(ConfigError::MissingKey("manifest_path"))?;
        let greetings = required_list(file.greetings, "greetings")?;
        let reactions = required_list(file.reactions, "reactions")?;

        let mut nouns = StringList::normalize(file.nouns);
        if nouns.is_empty() {
            nouns.push(DEFAULT_NOUN.to_string());
        }

        let api_base = file
            .api_base
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_SLACK_API_BASE.to_string());

        let config = Self {
            bot_name,
            bot_owner,
            manifest_path,
            nouns,
            greetings,
            triggers: StringList::normalize(file.triggers),
            reactions,
            adjectives: StringList::normalize(file.adjectives),
            api_base,
            request_timeout_ms: file.request_timeout_ms.unwrap_or(10_000),
            retry_max_attempts: file.retry_max_attempts.unwrap_or(3),
            retry_base_delay_ms: file.retry_base_delay_ms.unwrap_or(500),
            reconnect_base_delay_ms: file.reconnect_base_delay_ms.unwrap_or(5_000),
            reconnect_step_ms: file.reconnect_step_ms.unwrap_or(5_000),
            reconnect_max_delay_ms: file.reconnect_max_delay_ms.unwrap_or(3_600_000),
            reconnect_max_failures: file.reconnect_max_failures.unwrap_or(0),
            status_max_tags: file.status_max_tags.unwrap_or(10),
            processed_event_cap: file.processed_event_cap.unwrap_or(512),
            max_event_age_seconds: file.max_event_age_seconds.unwrap_or(600),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "request_timeout_ms",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.retry_max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "retry_max_attempts",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.reconnect_max_delay_ms < self.reconnect_base_delay_ms {
            return Err(ConfigError::Invalid {
                key: "reconnect_max_delay_ms",
                reason: "must not be smaller than reconnect_base_delay_ms".to_string(),
            });
        }
        if self.processed_event_cap == 0 {
            return Err(ConfigError::Invalid {
                key: "processed_event_cap",
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_max_attempts, self.retry_base_delay_ms)
    }

    pub fn reconnect_backoff(&self) -> ReconnectBackoff {
        ReconnectBackoff {
            base: Duration::from_millis(self.reconnect_base_delay_ms),
            step: Duration::from_millis(self.reconnect_step_ms),
            max: Duration::from_millis(self.reconnect_max_delay_ms),
            max_failures: self.reconnect_max_failures,
        }
    }
}
