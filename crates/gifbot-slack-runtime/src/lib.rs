//! Slack Socket Mode runtime for the gif bot.
//!
//! Loads the bot configuration, talks to the Slack Web API, keeps the Socket
//! Mode connection alive with reconnect backoff, and routes inbound messages to
//! the gif catalog.

pub mod backoff;
pub mod commands;
pub mod config;
pub mod render;
pub mod router;
pub mod runtime;
pub mod slack_api_client;
pub mod slack_events;
pub mod transport;

pub use backoff::{ReconnectBackoff, RetryPolicy};
pub use commands::{AdminCommand, MentionCommand};
pub use config::{ConfigError, GifBotConfig, DEFAULT_SLACK_API_BASE};
pub use router::{BotIdentity, GifBotRouter, InboundMessage, Phrasing, RouteOutcome};
pub use runtime::{run_gif_bot, GifBotRuntimeConfig};
pub use slack_api_client::{SlackApiClient, SlackPostedMessage};
pub use transport::ChatTransport;
