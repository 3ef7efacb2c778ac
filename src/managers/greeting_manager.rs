use poise::serenity_prelude::GuildId;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::guild::GuildApi;

/// Replaced by the member's display name
pub const NAME_PLACEHOLDER: &str = "{username}";

pub const GREETING_TEMPLATES: [&str; 6] = [
    "Yohohoho! Welcome aboard {username}! Let's make this journey a grand adventure! 🏴‍☠️",
    "SUUUUPER welcome to our crew, {username}! 🚢",
    "Shishishi! Hey {username}, welcome to our nakama! 🍖",
    "Welcome to the Grand Line, {username}! May your adventures be legendary! ⚓",
    "Ora ora! {username} has joined our pirate crew! 🗡️",
    "A new nakama appears! Welcome {username}! Let's set sail together! ⛵",
];

/// Substitute the first placeholder in a template
pub fn render_greeting(template: &str, display_name: &str) -> String {
    template.replacen(NAME_PLACEHOLDER, display_name, 1)
}

/// Pick a template uniformly at random and render it
pub fn pick_greeting<R: Rng + ?Sized>(rng: &mut R, display_name: &str) -> String {
    let template = GREETING_TEMPLATES
        .choose(rng)
        .copied()
        .unwrap_or(GREETING_TEMPLATES[0]);
    render_greeting(template, display_name)
}

/// Posts a welcome line when someone joins
pub struct GreetingManager {
    api: Arc<dyn GuildApi>,
    channel_name: String,
}

impl GreetingManager {
    pub fn new(api: Arc<dyn GuildApi>, channel_name: &str) -> Self {
        Self {
            api,
            channel_name: channel_name.to_string(),
        }
    }

    /// Fire and forget: a missing channel or failed send is only logged.
    /// Returns the greeting that was sent, if any.
    pub async fn greet(&self, guild_id: GuildId, display_name: &str) -> Option<String> {
        let channel_id = match self.api.find_text_channel(guild_id, &self.channel_name).await {
            Ok(Some(channel_id)) => channel_id,
            Ok(None) => {
                debug!(
                    "No '{}' channel in guild {}, skipping greeting",
                    self.channel_name, guild_id
                );
                return None;
            }
            Err(e) => {
                error!("Failed to look up welcome channel in guild {}: {}", guild_id, e);
                return None;
            }
        };

        let greeting = pick_greeting(&mut rand::thread_rng(), display_name);

        match self.api.send_text(channel_id, &greeting).await {
            Ok(()) => {
                info!("Greeted {} in guild {}", display_name, guild_id);
                Some(greeting)
            }
            Err(e) => {
                error!("Error sending welcome message: {}", e);
                None
            }
        }
    }
}

/// Shared greeting manager type
pub type SharedGreetingManager = Arc<GreetingManager>;

pub fn create_shared_greeting_manager(
    api: Arc<dyn GuildApi>,
    channel_name: &str,
) -> SharedGreetingManager {
    Arc::new(GreetingManager::new(api, channel_name))
}
