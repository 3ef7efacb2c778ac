use once_cell::sync::OnceCell;
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, UserId};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{RoleCatalog, RoleConfig};
use crate::error::{BotError, Result};
use crate::guild::{Announcement, GuildApi};

pub const SELECTION_TITLE: &str = "Role Selection";
const SELECTION_DESCRIPTION: &str = "React with the emojis below to get your roles!";
const SELECTION_COLOUR: u32 = 0x0099ff;

/// How far back to look for a selection message from a previous run
const HISTORY_LIMIT: u8 = 10;

/// A reaction, resolved to full data by the event handler
#[derive(Debug, Clone)]
pub struct ReactionEvent {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub user_id: UserId,
    pub user_is_bot: bool,
    pub symbol: String,
}

/// Owns the single "Role Selection" announcement in the self-roles channel
pub struct SelectionManager {
    api: Arc<dyn GuildApi>,
    catalog: Arc<RoleCatalog>,
    channel_name: String,
    channel_id: OnceCell<ChannelId>,
    message_id: OnceCell<MessageId>,
}

impl SelectionManager {
    pub fn new(api: Arc<dyn GuildApi>, catalog: Arc<RoleCatalog>, channel_name: &str) -> Self {
        Self {
            api,
            catalog,
            channel_name: channel_name.to_string(),
            channel_id: OnceCell::new(),
            message_id: OnceCell::new(),
        }
    }

    pub fn selection_message_id(&self) -> Option<MessageId> {
        self.message_id.get().copied()
    }

    pub fn selection_channel_id(&self) -> Option<ChannelId> {
        self.channel_id.get().copied()
    }

    /// Check that the channel and every catalog role exist, then make sure the
    /// selection message is in place. Nothing is posted if a check fails.
    pub async fn bootstrap(&self, guild_id: GuildId, bot_id: UserId) -> Result<MessageId> {
        let channel_id = self
            .api
            .find_text_channel(guild_id, &self.channel_name)
            .await?
            .ok_or_else(|| BotError::ChannelNotFound {
                name: self.channel_name.clone(),
            })?;

        let mut missing = Vec::new();
        for role in self.catalog.iter() {
            if self.api.find_role(guild_id, &role.role_name).await?.is_none() {
                missing.push(role.role_name.clone());
            }
        }
        if !missing.is_empty() {
            return Err(BotError::RolesNotFound { names: missing });
        }

        self.ensure_selection_message(channel_id, bot_id).await
    }

    /// Reuse the selection message from a previous run if one is in recent
    /// history, otherwise post it and add one reaction per catalog entry.
    pub async fn ensure_selection_message(
        &self,
        channel_id: ChannelId,
        bot_id: UserId,
    ) -> Result<MessageId> {
        if let Some(id) = self.message_id.get() {
            return Ok(*id);
        }
        let channel_id = *self.channel_id.get_or_init(|| channel_id);

        let recent = self.api.recent_messages(channel_id, HISTORY_LIMIT).await?;
        let existing = recent.iter().find(|m| {
            m.author_id == bot_id && m.first_embed_title.as_deref() == Some(SELECTION_TITLE)
        });

        let id = match existing {
            Some(message) => {
                info!("Found existing role selection message {}", message.id);
                message.id
            }
            None => {
                let id = self
                    .api
                    .send_announcement(channel_id, &self.announcement())
                    .await?;
                // The id is fixed once the message exists, even if a reaction below fails
                let _ = self.message_id.set(id);
                for role in self.catalog.iter() {
                    self.api.add_reaction(channel_id, id, &role.symbol).await?;
                }
                info!("Created role selection message {}", id);
                id
            }
        };

        Ok(*self.message_id.get_or_init(|| id))
    }

    pub fn announcement(&self) -> Announcement {
        Announcement {
            title: SELECTION_TITLE.to_string(),
            description: SELECTION_DESCRIPTION.to_string(),
            colour: SELECTION_COLOUR,
            fields: self
                .catalog
                .iter()
                .map(|r| {
                    (
                        format!("{} {}", r.symbol, r.role_name),
                        format!("Category: {}", r.category),
                    )
                })
                .collect(),
        }
    }

    /// The catalog entry a reaction asks for, if it should start a verification
    pub fn match_reaction(&self, event: &ReactionEvent) -> Option<&RoleConfig> {
        if event.user_is_bot {
            return None;
        }
        if self.selection_channel_id() != Some(event.channel_id)
            || self.selection_message_id() != Some(event.message_id)
        {
            return None;
        }

        let role = self.catalog.find_by_symbol(&event.symbol);
        if role.is_none() {
            debug!("Ignoring unknown reaction {} from {}", event.symbol, event.user_id);
        }
        role
    }
}

/// Shared selection manager type
pub type SharedSelectionManager = Arc<SelectionManager>;

pub fn create_shared_selection_manager(
    api: Arc<dyn GuildApi>,
    catalog: Arc<RoleCatalog>,
    channel_name: &str,
) -> SharedSelectionManager {
    Arc::new(SelectionManager::new(api, catalog, channel_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeGuildApi, BOT, GUILD, MEMBER};

    const CHANNEL: &str = "😋-self-roles";

    fn fake_with_roles() -> FakeGuildApi {
        let catalog = RoleCatalog::default();
        FakeGuildApi::new()
            .with_channel(CHANNEL)
            .with_roles(catalog.roles.iter().map(|r| r.role_name.as_str()))
    }

    fn manager(api: &FakeGuildApi) -> SelectionManager {
        SelectionManager::new(
            Arc::new(api.clone()),
            Arc::new(RoleCatalog::default()),
            CHANNEL,
        )
    }

    #[test]
    fn test_announcement_lists_catalog() {
        let api = FakeGuildApi::new();
        let announcement = manager(&api).announcement();

        assert_eq!(announcement.title, "Role Selection");
        assert_eq!(announcement.colour, 0x0099ff);
        assert_eq!(announcement.fields.len(), 4);
        assert_eq!(
            announcement.fields[0],
            (
                "💻 🧠 Logic Lords".to_string(),
                "Category: Software Development".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_bootstrap_creates_message_and_reactions() {
        let api = fake_with_roles();
        let selection = manager(&api);

        let id = selection.bootstrap(GUILD, BOT).await.unwrap();

        assert_eq!(selection.selection_message_id(), Some(id));
        assert_eq!(api.announcements().len(), 1);
        let symbols: Vec<String> = api.reactions().into_iter().map(|(_, s)| s).collect();
        assert_eq!(symbols, vec!["💻", "🎮", "🎬", "🎓"]);
        assert!(api.reactions().iter().all(|(m, _)| *m == id));
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent_across_restarts() {
        let api = fake_with_roles();

        let first = manager(&api).bootstrap(GUILD, BOT).await.unwrap();
        let channel = api.channel(CHANNEL).unwrap();
        api.seed_message(channel, MEMBER, None);

        let restarted = manager(&api);
        let second = restarted.bootstrap(GUILD, BOT).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(restarted.selection_message_id(), Some(first));
        let selection_messages = api
            .history(channel)
            .into_iter()
            .filter(|m| m.first_embed_title.as_deref() == Some(SELECTION_TITLE))
            .count();
        assert_eq!(selection_messages, 1);
        assert_eq!(api.reactions().len(), 4);
    }

    #[tokio::test]
    async fn test_ignores_selection_messages_from_other_authors() {
        let api = fake_with_roles();
        let channel = api.channel(CHANNEL).unwrap();
        api.seed_message(channel, MEMBER, Some(SELECTION_TITLE));

        let id = manager(&api).bootstrap(GUILD, BOT).await.unwrap();

        assert_eq!(api.announcements().len(), 1);
        assert_ne!(api.history(channel)[0].id, id);
    }

    #[tokio::test]
    async fn test_old_message_outside_history_window_is_not_reused() {
        let api = fake_with_roles();
        let first = manager(&api).bootstrap(GUILD, BOT).await.unwrap();

        let channel = api.channel(CHANNEL).unwrap();
        for _ in 0..HISTORY_LIMIT {
            api.seed_message(channel, MEMBER, None);
        }

        let second = manager(&api).bootstrap(GUILD, BOT).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(api.announcements().len(), 2);
    }

    #[tokio::test]
    async fn test_bootstrap_aborts_without_channel() {
        let catalog = RoleCatalog::default();
        let api = FakeGuildApi::new().with_roles(catalog.roles.iter().map(|r| r.role_name.as_str()));
        let selection = manager(&api);

        let err = selection.bootstrap(GUILD, BOT).await.unwrap_err();
        assert!(matches!(err, BotError::ChannelNotFound { .. }));
        assert!(api.announcements().is_empty());
        assert!(selection.selection_message_id().is_none());
    }

    #[tokio::test]
    async fn test_bootstrap_aborts_with_missing_roles() {
        let api = FakeGuildApi::new()
            .with_channel(CHANNEL)
            .with_role("🧠 Logic Lords");
        let selection = manager(&api);

        match selection.bootstrap(GUILD, BOT).await {
            Err(BotError::RolesNotFound { names }) => {
                assert_eq!(names, vec!["👾 Game On", "📽️ Cinephile", "💼 Parul Alumni"]);
            }
            other => panic!("expected missing roles, got {:?}", other),
        }
        assert!(api.announcements().is_empty());
        assert!(api.reactions().is_empty());
    }

    #[tokio::test]
    async fn test_match_reaction() {
        let api = fake_with_roles();
        let selection = manager(&api);
        let message_id = selection.bootstrap(GUILD, BOT).await.unwrap();
        let channel_id = api.channel(CHANNEL).unwrap();

        let event = ReactionEvent {
            guild_id: GUILD,
            channel_id,
            message_id,
            user_id: MEMBER,
            user_is_bot: false,
            symbol: "🎮".to_string(),
        };
        assert_eq!(
            selection.match_reaction(&event).map(|r| r.role_name.as_str()),
            Some("👾 Game On")
        );

        let by_bot = ReactionEvent {
            user_is_bot: true,
            ..event.clone()
        };
        assert!(selection.match_reaction(&by_bot).is_none());

        let unknown_symbol = ReactionEvent {
            symbol: "🍕".to_string(),
            ..event.clone()
        };
        assert!(selection.match_reaction(&unknown_symbol).is_none());

        let other_message = ReactionEvent {
            message_id: MessageId::new(1),
            ..event.clone()
        };
        assert!(selection.match_reaction(&other_message).is_none());

        let other_channel = ReactionEvent {
            channel_id: ChannelId::new(1),
            ..event
        };
        assert!(selection.match_reaction(&other_channel).is_none());
    }

    #[tokio::test]
    async fn test_no_match_before_bootstrap() {
        let api = fake_with_roles();
        let selection = manager(&api);
        let event = ReactionEvent {
            guild_id: GUILD,
            channel_id: api.channel(CHANNEL).unwrap(),
            message_id: MessageId::new(1),
            user_id: MEMBER,
            user_is_bot: false,
            symbol: "💻".to_string(),
        };
        assert!(selection.match_reaction(&event).is_none());
    }
}
