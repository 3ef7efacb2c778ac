use poise::serenity_prelude as serenity;
use std::time::Duration;
use tracing::info;

use crate::config::RoleCatalog;
use crate::{Context, Error};

/// Check if the bot is running
#[poise::command(prefix_command, slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    info!("Ping command called by {}", ctx.author().name);
    ctx.send(poise::CreateReply::default()
        .content("Pong! Bot is working!")
        .ephemeral(true))
        .await?;
    Ok(())
}

/// Explain how self roles work
#[poise::command(prefix_command, slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let embed = help_embed(
        &data.catalog,
        &data.config.self_roles_channel,
        data.config.answer_window,
    );

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true)).await?;
    Ok(())
}

fn help_lines(catalog: &RoleCatalog) -> Vec<(String, String)> {
    catalog
        .iter()
        .map(|r| {
            (
                format!("{} {}", r.symbol, r.role_name),
                format!("Answer a {} question to unlock it", r.category),
            )
        })
        .collect()
}

fn describe_window(window: Duration) -> String {
    let secs = window.as_secs();
    match secs {
        60 => "1 minute".to_string(),
        s if s > 60 && s % 60 == 0 => format!("{} minutes", s / 60),
        s => format!("{} seconds", s),
    }
}

fn help_embed(catalog: &RoleCatalog, channel_name: &str, window: Duration) -> serenity::CreateEmbed {
    help_lines(catalog).into_iter().fold(
        serenity::CreateEmbed::new()
            .title("Self Roles")
            .description(format!(
                "React in #{} to request a role. I'll DM you a question; answer it within {} to get the role.\n\n\
                Commands: `/ping`, `/help`",
                channel_name,
                describe_window(window)
            ))
            .color(0x3498db),
        |embed, (name, value)| embed.field(name, value, false),
    )
}
