//! Socket Mode envelope decoding and inbound event bookkeeping.

use std::collections::{HashSet, VecDeque};

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::router::InboundMessage;

#[derive(Debug, Clone, Deserialize)]
pub struct SlackSocketEnvelope {
    /// Absent on `hello` and `disconnect` control envelopes.
    #[serde(default)]
    pub envelope_id: Option<String>,
    #[serde(rename = "type")]
    pub envelope_type: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEvent {
    /// Dedup key combining event id, channel and message timestamp.
    pub key: String,
    pub occurred_unix_ms: u64,
    pub message: InboundMessage,
}

pub fn parse_socket_envelope(message: WsMessage) -> Result<Option<SlackSocketEnvelope>> {
    match message {
        WsMessage::Text(text) => {
            let envelope = serde_json::from_str::<SlackSocketEnvelope>(&text)
                .context("failed to parse slack socket envelope")?;
            Ok(Some(envelope))
        }
        WsMessage::Binary(bytes) => {
            let text =
                String::from_utf8(bytes.to_vec()).context("invalid utf-8 slack socket payload")?;
            let envelope = serde_json::from_str::<SlackSocketEnvelope>(&text)
                .context("failed to parse slack socket envelope")?;
            Ok(Some(envelope))
        }
        WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Close(_) | WsMessage::Frame(_) => {
            Ok(None)
        }
    }
}

#[derive(Debug, Deserialize)]
struct SlackEventCallbackEnvelope {
    #[serde(rename = "type")]
    callback_type: String,
    #[serde(default)]
    event_id: String,
    #[serde(default)]
    event_time: u64,
    event: SlackEventPayload,
}

#[derive(Debug, Deserialize)]
struct SlackEventPayload {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    channel_type: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn ts_to_unix_ms(ts: &str) -> u64 {
    ts.parse::<f64>()
        .ok()
        .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
        .map(|seconds| (seconds * 1000.0) as u64)
        .unwrap_or(0)
}

/// Extracts a routable user message from an `events_api` envelope. Only plain
/// `message` events qualify; `app_mention` duplicates them and subtyped
/// messages are edits, joins or bot output.
pub fn normalize_socket_envelope(envelope: &SlackSocketEnvelope) -> Result<Option<NormalizedEvent>> {
    if envelope.envelope_type != "events_api" {
        return Ok(None);
    }

    let callback = serde_json::from_value::<SlackEventCallbackEnvelope>(envelope.payload.clone())
        .context("failed to decode slack event callback payload")?;
    if callback.callback_type != "event_callback" {
        return Ok(None);
    }

    let event = callback.event;
    if event.event_type != "message" || event.subtype.is_some() {
        return Ok(None);
    }
    let Some(user_id) = non_blank(event.user) else {
        return Ok(None);
    };
    let Some(channel_id) = non_blank(event.channel) else {
        return Ok(None);
    };
    let Some(ts) = non_blank(event.ts) else {
        return Ok(None);
    };

    let occurred_unix_ms = if callback.event_time > 0 {
        callback.event_time.saturating_mul(1000)
    } else {
        ts_to_unix_ms(&ts)
    };

    Ok(Some(NormalizedEvent {
        key: format!("{}:{}:{}", callback.event_id, channel_id, ts),
        occurred_unix_ms,
        message: InboundMessage {
            user_id,
            channel_id,
            channel_type: event.channel_type,
            text: event.text.unwrap_or_default(),
            ts,
        },
    }))
}

pub fn event_is_stale(event: &NormalizedEvent, max_event_age_seconds: u64, now_unix_ms: u64) -> bool {
    if max_event_age_seconds == 0 {
        return false;
    }
    let max_age_ms = max_event_age_seconds.saturating_mul(1000);
    now_unix_ms.saturating_sub(event.occurred_unix_ms) > max_age_ms
}

pub fn current_unix_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Clone)]
/// Bounded memory of handled event keys; the oldest key is forgotten first.
pub struct ProcessedEventIndex {
    cap: usize,
    order: VecDeque<String>,
    index: HashSet<String>,
}

impl ProcessedEventIndex {
    pub fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            order: VecDeque::new(),
            index: HashSet::new(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains(key)
    }

    /// Records `key`, returning false when it was already present.
    pub fn mark_processed(&mut self, key: &str) -> bool {
        if self.index.contains(key) {
            return false;
        }
        self.index.insert(key.to_string());
        self.order.push_back(key.to_string());
        while self.order.len() > self.cap {
            if let Some(evicted) = self.order.pop_front() {
                self.index.remove(&evicted);
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
