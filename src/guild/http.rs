use async_trait::async_trait;
use poise::serenity_prelude::{
    self as serenity, ChannelId, GuildId, Http, MessageId, RoleId, UserId,
};
use std::sync::Arc;
use tracing::{debug, info};

use super::api::{Announcement, GuildApi, PostedMessage, QuestionPrompt, UserSummary};
use crate::error::Result;

/// Discord caps button labels at 80 characters
const MAX_BUTTON_LABEL: usize = 80;

/// `GuildApi` backed by serenity's HTTP client
pub struct SerenityGuildApi {
    http: Arc<Http>,
}

impl SerenityGuildApi {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl GuildApi for SerenityGuildApi {
    async fn find_text_channel(&self, guild_id: GuildId, name: &str) -> Result<Option<ChannelId>> {
        let channels = guild_id.channels(&self.http).await?;

        Ok(channels
            .values()
            .find(|c| c.kind == serenity::ChannelType::Text && c.name == name)
            .map(|c| c.id))
    }

    async fn find_role(&self, guild_id: GuildId, name: &str) -> Result<Option<RoleId>> {
        let roles = guild_id.roles(&self.http).await?;

        Ok(roles
            .iter()
            .find(|(_, r)| r.name == name)
            .map(|(role_id, _)| *role_id))
    }

    async fn recent_messages(&self, channel_id: ChannelId, limit: u8) -> Result<Vec<PostedMessage>> {
        let messages = channel_id
            .messages(&self.http, serenity::GetMessages::new().limit(limit))
            .await?;

        Ok(messages
            .into_iter()
            .map(|m| PostedMessage {
                id: m.id,
                author_id: m.author.id,
                first_embed_title: m.embeds.first().and_then(|e| e.title.clone()),
            })
            .collect())
    }

    async fn send_announcement(
        &self,
        channel_id: ChannelId,
        announcement: &Announcement,
    ) -> Result<MessageId> {
        let embed = announcement.fields.iter().fold(
            serenity::CreateEmbed::new()
                .title(&announcement.title)
                .description(&announcement.description)
                .color(announcement.colour),
            |embed, (name, value)| embed.field(name, value, false),
        );

        let message = channel_id
            .send_message(&self.http, serenity::CreateMessage::new().embed(embed))
            .await?;

        info!("Posted '{}' in channel {}", announcement.title, channel_id);
        Ok(message.id)
    }

    async fn add_reaction(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        symbol: &str,
    ) -> Result<()> {
        channel_id
            .create_reaction(
                &self.http,
                message_id,
                serenity::ReactionType::Unicode(symbol.to_string()),
            )
            .await?;
        Ok(())
    }

    async fn send_text(&self, channel_id: ChannelId, content: &str) -> Result<()> {
        channel_id.say(&self.http, content).await?;
        Ok(())
    }

    async fn fetch_user(&self, user_id: UserId) -> Result<UserSummary> {
        let user = user_id.to_user(&self.http).await?;
        Ok(UserSummary {
            id: user.id,
            bot: user.bot,
        })
    }

    async fn open_dm(&self, user_id: UserId) -> Result<ChannelId> {
        let channel = user_id.create_dm_channel(&self.http).await?;
        debug!("Opened DM channel {} with {}", channel.id, user_id);
        Ok(channel.id)
    }

    async fn send_question(
        &self,
        channel_id: ChannelId,
        prompt: &QuestionPrompt,
    ) -> Result<MessageId> {
        let embed = serenity::CreateEmbed::new()
            .title(&prompt.title)
            .description(&prompt.question)
            .color(0x0099ff);

        let buttons = prompt
            .buttons
            .iter()
            .map(|b| {
                serenity::CreateButton::new(&b.custom_id)
                    .label(truncate_label(&b.label))
                    .style(serenity::ButtonStyle::Primary)
            })
            .collect();

        let message = channel_id
            .send_message(
                &self.http,
                serenity::CreateMessage::new()
                    .embed(embed)
                    .components(vec![serenity::CreateActionRow::Buttons(buttons)]),
            )
            .await?;

        Ok(message.id)
    }

    async fn add_member_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<()> {
        let member = guild_id.member(&self.http, user_id).await?;
        member.add_role(&self.http, role_id).await?;
        Ok(())
    }
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() <= MAX_BUTTON_LABEL {
        return label.to_string();
    }
    let mut truncated: String = label.chars().take(MAX_BUTTON_LABEL - 1).collect();
    truncated.push('…');
    truncated
}
