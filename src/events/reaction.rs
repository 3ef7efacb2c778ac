use poise::serenity_prelude::{self as serenity, ChannelId, GuildId, MessageId, UserId};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::guild::GuildApi;
use crate::managers::selection_manager::SelectionManager;
use crate::managers::{
    ReactionEvent, SharedVerificationManager, VerificationOutcome, VerificationRequest,
};
use crate::{Data, Error};

/// Handle a reaction added anywhere the bot can see
pub async fn handle_reaction_add(
    _ctx: &serenity::Context,
    reaction: &serenity::Reaction,
    data: &Data,
) -> Result<(), Error> {
    let Some(guild_id) = reaction.guild_id else {
        return Ok(());
    };
    let serenity::ReactionType::Unicode(symbol) = &reaction.emoji else {
        return Ok(());
    };

    // Most reactions are on unrelated messages; skip them before any API call
    if data.selection_manager.selection_message_id() != Some(reaction.message_id) {
        return Ok(());
    }

    let Some(event) = resolve_reaction(
        data.api.as_ref(),
        guild_id,
        reaction.channel_id,
        reaction.message_id,
        reaction.user_id,
        symbol,
    )
    .await
    else {
        return Ok(());
    };

    dispatch_reaction(&data.selection_manager, &data.verification_manager, event);
    Ok(())
}

/// Turn a gateway reaction into a `ReactionEvent`.
///
/// Gateway payloads only carry the user id, so the user is fetched before
/// anything is decided. A missing id or failed lookup drops this event only.
pub async fn resolve_reaction(
    api: &dyn GuildApi,
    guild_id: GuildId,
    channel_id: ChannelId,
    message_id: MessageId,
    user_id: Option<UserId>,
    symbol: &str,
) -> Option<ReactionEvent> {
    let Some(user_id) = user_id else {
        warn!("Reaction on message {} has no user", message_id);
        return None;
    };

    let user = match api.fetch_user(user_id).await {
        Ok(user) => user,
        Err(e) => {
            warn!(
                "Error fetching reaction user {} on message {}: {}",
                user_id, message_id, e
            );
            return None;
        }
    };

    Some(ReactionEvent {
        guild_id,
        channel_id,
        message_id,
        user_id: user.id,
        user_is_bot: user.bot,
        symbol: symbol.to_string(),
    })
}

/// Start a verification flow if the reaction asks for a catalog role.
///
/// The flow runs on its own task so the event loop is never held up by the
/// answer window.
pub fn dispatch_reaction(
    selection: &SelectionManager,
    verification: &SharedVerificationManager,
    event: ReactionEvent,
) -> Option<JoinHandle<VerificationOutcome>> {
    let Some(role) = selection.match_reaction(&event).cloned() else {
        debug!(
            "Reaction {} by {} on message {} does not start a verification",
            event.symbol, event.user_id, event.message_id
        );
        return None;
    };

    info!(
        "User {} requested role '{}' in guild {}",
        event.user_id, role.role_name, event.guild_id
    );

    let verification = verification.clone();
    let request = VerificationRequest {
        guild_id: event.guild_id,
        user_id: event.user_id,
        role,
    };
    Some(tokio::spawn(async move { verification.verify(request).await }))
}
