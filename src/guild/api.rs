use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, RoleId, UserId};

use crate::error::Result;

/// Summary of a message fetched from channel history
#[derive(Debug, Clone, PartialEq)]
pub struct PostedMessage {
    pub id: MessageId,
    pub author_id: UserId,
    pub first_embed_title: Option<String>,
}

/// The parts of a user needed to decide whether a reaction counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserSummary {
    pub id: UserId,
    pub bot: bool,
}

/// Embed posted to a guild channel
#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    pub title: String,
    pub description: String,
    pub colour: u32,
    /// (name, value) pairs, rendered in order
    pub fields: Vec<(String, String)>,
}

/// A button attached to a question DM
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerButton {
    pub custom_id: String,
    pub label: String,
}

/// Question DM: embed with the question text and one button per option
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionPrompt {
    pub title: String,
    pub question: String,
    pub buttons: Vec<AnswerButton>,
}

/// The Discord operations the managers depend on.
///
/// Production code talks to Discord through serenity's HTTP client; tests swap
/// in an in-memory fake.
#[async_trait]
pub trait GuildApi: Send + Sync {
    /// Find a text channel in the guild by exact name
    async fn find_text_channel(&self, guild_id: GuildId, name: &str) -> Result<Option<ChannelId>>;

    /// Find a role in the guild by exact name
    async fn find_role(&self, guild_id: GuildId, name: &str) -> Result<Option<RoleId>>;

    /// Most recent messages in a channel, newest first
    async fn recent_messages(&self, channel_id: ChannelId, limit: u8) -> Result<Vec<PostedMessage>>;

    async fn send_announcement(
        &self,
        channel_id: ChannelId,
        announcement: &Announcement,
    ) -> Result<MessageId>;

    /// React to a message with a unicode emoji
    async fn add_reaction(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        symbol: &str,
    ) -> Result<()>;

    async fn send_text(&self, channel_id: ChannelId, content: &str) -> Result<()>;

    /// Fetch a user that a gateway payload only referenced by id
    async fn fetch_user(&self, user_id: UserId) -> Result<UserSummary>;

    /// Open (or reuse) the DM channel with a user
    async fn open_dm(&self, user_id: UserId) -> Result<ChannelId>;

    async fn send_question(&self, channel_id: ChannelId, prompt: &QuestionPrompt)
        -> Result<MessageId>;

    async fn add_member_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId)
        -> Result<()>;
}
