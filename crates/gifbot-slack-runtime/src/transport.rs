use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
/// Outbound chat primitives the router needs from a workspace connection.
pub trait ChatTransport: Send + Sync {
    async fn post_message(&self, channel: &str, text: &str) -> Result<()>;

    /// Adds emoji `reaction` (without colons) to the message at `ts`.
    async fn add_reaction(&self, channel: &str, ts: &str, reaction: &str) -> Result<()>;
}
