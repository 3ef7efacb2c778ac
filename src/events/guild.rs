use poise::serenity_prelude as serenity;
use tracing::{error, info};

use crate::managers::selection_manager::SelectionManager;
use crate::{Data, Error};

/// Set up the self-roles channel for a guild on startup.
///
/// Configuration problems only disable the self-roles feature; greetings and
/// everything else keep running.
pub async fn bootstrap_self_roles(
    selection: &SelectionManager,
    guild_id: serenity::GuildId,
    bot_id: serenity::UserId,
) -> bool {
    info!("Setting up self roles for guild {}", guild_id);

    match selection.bootstrap(guild_id, bot_id).await {
        Ok(message_id) => {
            info!(
                "Role selection message ready in guild {}: {}",
                guild_id, message_id
            );
            true
        }
        Err(e) => {
            error!(
                "Self roles disabled for guild {}: {}. Create the missing channel or roles and restart the bot.",
                guild_id, e
            );
            false
        }
    }
}

/// Handle when a new member joins the guild
pub async fn handle_member_add(
    _ctx: &serenity::Context,
    new_member: &serenity::Member,
    data: &Data,
) -> Result<(), Error> {
    info!(
        "New member joined: {} in guild {}",
        new_member.user.name, new_member.guild_id
    );

    data.greeting_manager
        .greet(new_member.guild_id, new_member.display_name())
        .await;

    Ok(())
}
