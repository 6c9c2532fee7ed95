pub mod discord;

use anyhow::Result;

pub use discord::{BotUser, DiscordTransport};

pub type ChannelId = u64;

/// A resolved, deliverable chat channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: ChannelId,
    pub name: String,
}

/// Outbound side of the relay: turns channel ids into targets and posts text.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// `Ok(None)` means the channel does not exist or is not visible to the bot.
    async fn resolve_target(&self, id: ChannelId) -> Result<Option<Target>>;
    async fn send(&self, target: &Target, text: &str) -> Result<()>;
}
