//! In-memory stand-ins for Discord and the text generator, used by unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, RoleId, UserId};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{BotError, QuestionError, Result};
use crate::guild::api::{PostedMessage, UserSummary};
use crate::guild::{Announcement, GuildApi, QuestionPrompt};
use crate::managers::question_provider::TextGenerator;

pub const GUILD: GuildId = GuildId::new(1);
pub const BOT: UserId = UserId::new(10);
pub const MEMBER: UserId = UserId::new(20);

#[derive(Default)]
struct FakeState {
    channels: HashMap<String, ChannelId>,
    roles: HashMap<String, RoleId>,
    history: HashMap<ChannelId, Vec<PostedMessage>>,
    announcements: Vec<(ChannelId, Announcement)>,
    reactions: Vec<(MessageId, String)>,
    texts: Vec<(ChannelId, String)>,
    questions: Vec<(ChannelId, QuestionPrompt)>,
    grants: Vec<(GuildId, UserId, RoleId)>,
    dm_blocked: bool,
    send_fails: bool,
    text_fails: bool,
    unknown_users: Vec<UserId>,
}

/// Records every call; channels and roles are registered up front
#[derive(Clone)]
pub struct FakeGuildApi {
    state: Arc<Mutex<FakeState>>,
    next_id: Arc<AtomicU64>,
    bot_id: UserId,
}

impl FakeGuildApi {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
            next_id: Arc::new(AtomicU64::new(1000)),
            bot_id: BOT,
        }
    }

    fn next(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn with_channel(self, name: &str) -> Self {
        let id = ChannelId::new(self.next());
        self.state.lock().channels.insert(name.to_string(), id);
        self
    }

    pub fn with_role(self, name: &str) -> Self {
        let id = RoleId::new(self.next());
        self.state.lock().roles.insert(name.to_string(), id);
        self
    }

    pub fn with_roles<'a>(self, names: impl IntoIterator<Item = &'a str>) -> Self {
        names.into_iter().fold(self, |api, name| api.with_role(name))
    }

    pub fn block_dms(&self) {
        self.state.lock().dm_blocked = true;
    }

    pub fn fail_sends(&self) {
        self.state.lock().send_fails = true;
    }

    /// Fail plain text messages only; embeds and questions still go through
    pub fn fail_texts(&self) {
        self.state.lock().text_fails = true;
    }

    /// Make user lookups for `user_id` fail
    pub fn forget_user(&self, user_id: UserId) {
        self.state.lock().unknown_users.push(user_id);
    }

    pub fn channel(&self, name: &str) -> Option<ChannelId> {
        self.state.lock().channels.get(name).copied()
    }

    pub fn role(&self, name: &str) -> Option<RoleId> {
        self.state.lock().roles.get(name).copied()
    }

    /// Post a message into channel history as if someone else sent it
    pub fn seed_message(&self, channel_id: ChannelId, author_id: UserId, embed_title: Option<&str>) {
        let message = PostedMessage {
            id: MessageId::new(self.next()),
            author_id,
            first_embed_title: embed_title.map(str::to_string),
        };
        self.state
            .lock()
            .history
            .entry(channel_id)
            .or_default()
            .push(message);
    }

    pub fn history(&self, channel_id: ChannelId) -> Vec<PostedMessage> {
        self.state
            .lock()
            .history
            .get(&channel_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn announcements(&self) -> Vec<(ChannelId, Announcement)> {
        self.state.lock().announcements.clone()
    }

    pub fn reactions(&self) -> Vec<(MessageId, String)> {
        self.state.lock().reactions.clone()
    }

    pub fn texts(&self) -> Vec<(ChannelId, String)> {
        self.state.lock().texts.clone()
    }

    pub fn questions(&self) -> Vec<(ChannelId, QuestionPrompt)> {
        self.state.lock().questions.clone()
    }

    pub fn grants(&self) -> Vec<(GuildId, UserId, RoleId)> {
        self.state.lock().grants.clone()
    }

    /// DM channel ids are derived from the user id
    pub fn dm_channel(user_id: UserId) -> ChannelId {
        ChannelId::new(500_000 + user_id.get())
    }

    /// Poll until a question DM has been sent
    pub async fn wait_for_question(&self) -> QuestionPrompt {
        for _ in 0..200 {
            if let Some((_, prompt)) = self.questions().into_iter().last() {
                return prompt;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("no question was sent");
    }

    fn check_send(&self) -> Result<()> {
        if self.state.lock().send_fails {
            return Err(BotError::Discord {
                message: "Missing Access".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl GuildApi for FakeGuildApi {
    async fn find_text_channel(&self, _guild_id: GuildId, name: &str) -> Result<Option<ChannelId>> {
        Ok(self.channel(name))
    }

    async fn find_role(&self, _guild_id: GuildId, name: &str) -> Result<Option<RoleId>> {
        Ok(self.role(name))
    }

    async fn recent_messages(&self, channel_id: ChannelId, limit: u8) -> Result<Vec<PostedMessage>> {
        let history = self.history(channel_id);
        Ok(history.into_iter().rev().take(limit as usize).collect())
    }

    async fn send_announcement(
        &self,
        channel_id: ChannelId,
        announcement: &Announcement,
    ) -> Result<MessageId> {
        self.check_send()?;
        let id = MessageId::new(self.next());
        let mut state = self.state.lock();
        state.history.entry(channel_id).or_default().push(PostedMessage {
            id,
            author_id: self.bot_id,
            first_embed_title: Some(announcement.title.clone()),
        });
        state.announcements.push((channel_id, announcement.clone()));
        Ok(id)
    }

    async fn add_reaction(
        &self,
        _channel_id: ChannelId,
        message_id: MessageId,
        symbol: &str,
    ) -> Result<()> {
        self.state
            .lock()
            .reactions
            .push((message_id, symbol.to_string()));
        Ok(())
    }

    async fn send_text(&self, channel_id: ChannelId, content: &str) -> Result<()> {
        self.check_send()?;
        if self.state.lock().text_fails {
            return Err(BotError::Discord {
                message: "Cannot send messages to this user".to_string(),
            });
        }
        self.state
            .lock()
            .texts
            .push((channel_id, content.to_string()));
        Ok(())
    }

    async fn fetch_user(&self, user_id: UserId) -> Result<UserSummary> {
        if self.state.lock().unknown_users.contains(&user_id) {
            return Err(BotError::Discord {
                message: "Unknown User".to_string(),
            });
        }
        Ok(UserSummary {
            id: user_id,
            bot: user_id == self.bot_id,
        })
    }

    async fn open_dm(&self, user_id: UserId) -> Result<ChannelId> {
        if self.state.lock().dm_blocked {
            return Err(BotError::Discord {
                message: "Cannot send messages to this user".to_string(),
            });
        }
        Ok(Self::dm_channel(user_id))
    }

    async fn send_question(
        &self,
        channel_id: ChannelId,
        prompt: &QuestionPrompt,
    ) -> Result<MessageId> {
        self.check_send()?;
        self.state
            .lock()
            .questions
            .push((channel_id, prompt.clone()));
        Ok(MessageId::new(self.next()))
    }

    async fn add_member_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<()> {
        self.state.lock().grants.push((guild_id, user_id, role_id));
        Ok(())
    }
}

/// Text generator returning queued responses in order
#[derive(Clone, Default)]
pub struct ScriptedGenerator {
    responses: Arc<Mutex<VecDeque<std::result::Result<String, QuestionError>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_ok(&self, text: &str) {
        self.responses.lock().push_back(Ok(text.to_string()));
    }

    pub fn push_err(&self, err: QuestionError) {
        self.responses.lock().push_back(Err(err));
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _schema: &serde_json::Value,
    ) -> std::result::Result<String, QuestionError> {
        self.prompts.lock().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.responses.lock().pop_front();
        next.unwrap_or_else(|| Err(QuestionError::Transport("no scripted response".to_string())))
    }
}
