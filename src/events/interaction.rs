use poise::serenity_prelude as serenity;
use tracing::{debug, warn};

use crate::managers::AnswerKey;
use crate::{Data, Error};

/// Handle button presses on verification questions
pub async fn handle_interaction(
    ctx: &serenity::Context,
    interaction: &serenity::Interaction,
    data: &Data,
) -> Result<(), Error> {
    let serenity::Interaction::Component(component) = interaction else {
        return Ok(());
    };
    let Some(key) = AnswerKey::parse(&component.data.custom_id) else {
        return Ok(());
    };

    let disposition = data
        .verification_manager
        .submit_answer(key, component.user.id);
    debug!(
        "Answer {} from {}: {:?}",
        component.data.custom_id, component.user.name, disposition
    );

    // The outcome arrives as a separate DM; the press itself only needs acknowledging
    if let Err(e) = component
        .create_response(&ctx.http, serenity::CreateInteractionResponse::Acknowledge)
        .await
    {
        warn!(
            "Failed to acknowledge answer from {}: {}",
            component.user.name, e
        );
    }

    Ok(())
}
