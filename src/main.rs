use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::filter::LevelFilter;

/// Discord bot that greets new members and hands out quiz-gated self roles
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Register commands per-guild instead of globally (faster for testing)
    #[arg(long)]
    guild_commands: bool,

    /// Guild to set up self roles in (defaults to the first guild the bot is in)
    #[arg(long)]
    guild_id: Option<u64>,
}

mod commands;
mod config;
mod error;
mod events;
mod guild;
mod logging;
mod managers;
mod messages;
#[cfg(test)]
mod testing;

use commands::{help, ping};
use config::{BotConfig, RoleCatalog};
use events::{bootstrap_self_roles, handle_interaction, handle_member_add, handle_reaction_add};
use guild::{GuildApi, SerenityGuildApi};
use managers::{
    create_shared_greeting_manager, create_shared_selection_manager,
    create_shared_verification_manager, GeminiClient, QuestionProvider, SharedGreetingManager,
    SharedSelectionManager, SharedVerificationManager,
};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared application state
pub struct Data {
    pub config: Arc<BotConfig>,
    pub catalog: Arc<RoleCatalog>,
    pub api: Arc<dyn GuildApi>,
    pub selection_manager: SharedSelectionManager,
    pub verification_manager: SharedVerificationManager,
    pub greeting_manager: SharedGreetingManager,
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            if let Err(e) = handle_member_add(ctx, new_member, data).await {
                error!("Failed to handle new member: {}", e);
            }
        }
        serenity::FullEvent::ReactionAdd { add_reaction } => {
            if let Err(e) = handle_reaction_add(ctx, add_reaction, data).await {
                error!("Failed to handle reaction: {}", e);
            }
        }
        serenity::FullEvent::InteractionCreate { interaction } => {
            if let Err(e) = handle_interaction(ctx, interaction, data).await {
                error!("Failed to handle interaction: {}", e);
            }
        }
        _ => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let config = match BotConfig::from_env() {
        Ok(config) => {
            logging::init(config.log_level);
            Arc::new(config)
        }
        Err(e) => {
            logging::init(LevelFilter::INFO);
            error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(app_id) = config.application_id() {
        info!("Bot ID: {} (configure intents at https://discord.com/developers/applications/{}/bot)", app_id, app_id);
    }

    let catalog = match &config.role_catalog_path {
        Some(path) => {
            let catalog = RoleCatalog::load_from_file(path)?;
            info!("Loaded {} roles from {}", catalog.roles.len(), path);
            catalog
        }
        None => RoleCatalog::default(),
    };
    let catalog = Arc::new(catalog);

    let generator = GeminiClient::new(
        &config.gemini_api_key,
        &config.gemini_model,
        config.generation_timeout,
    )?;
    let question_provider = QuestionProvider::new(Arc::new(generator), config.generation_timeout);

    let guild_commands = args.guild_commands;
    let target_guild_id = args.guild_id;

    if guild_commands {
        info!("--guild-commands: Will register commands per-guild (faster for testing)");
    } else {
        info!("Registering commands globally by default (takes up to 1 hour to propagate)");
    }

    let setup_config = config.clone();

    // Build framework
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![ping(), help()],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' invoked by {} (ID: {}) in {}",
                        ctx.command().qualified_name,
                        ctx.author().name,
                        ctx.author().id,
                        ctx.guild_id().map(|g| g.to_string()).unwrap_or_else(|| "DM".to_string())
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' completed for {}",
                        ctx.command().qualified_name,
                        ctx.author().name
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!("Error in command '{}': {}", ctx.command().qualified_name, error);
                            let _ = ctx.say("Sorry, something went wrong. Please try again later.").await;
                        }
                        poise::FrameworkError::ArgumentParse { error, input, ctx, .. } => {
                            error!("Argument parse error in '{}': {} (input: {:?})", ctx.command().qualified_name, error, input);
                        }
                        poise::FrameworkError::EventHandler { error, event, .. } => {
                            error!("Error handling event {}: {}", event.snake_case_name(), error);
                        }
                        other => {
                            error!("Other framework error: {}", other);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            let config = setup_config.clone();
            let catalog = catalog.clone();

            Box::pin(async move {
                info!("Bot logged in as: {}", ready.user.name);

                let api: Arc<dyn GuildApi> = Arc::new(SerenityGuildApi::new(ctx.http.clone()));
                let selection_manager = create_shared_selection_manager(
                    api.clone(),
                    catalog.clone(),
                    &config.self_roles_channel,
                );
                let verification_manager = create_shared_verification_manager(
                    api.clone(),
                    question_provider,
                    config.answer_window,
                );
                let greeting_manager =
                    create_shared_greeting_manager(api.clone(), &config.welcome_channel);

                let bootstrap_guild = target_guild_id
                    .map(serenity::GuildId::new)
                    .or_else(|| ready.guilds.first().map(|g| g.id));

                match bootstrap_guild {
                    Some(guild_id) => {
                        bootstrap_self_roles(&selection_manager, guild_id, ready.user.id).await;
                    }
                    None => {
                        error!("No guild found! Make sure the bot is in a server.");
                    }
                }

                if guild_commands {
                    for guild in &ready.guilds {
                        if let Err(e) = poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            guild.id,
                        ).await {
                            error!("Failed to register commands for guild {}: {}", guild.id, e);
                        } else {
                            info!("Successfully registered {} commands for guild {}",
                                  framework.options().commands.len(), guild.id);
                        }
                    }
                } else if let Err(e) = poise::builtins::register_globally(
                    ctx,
                    &framework.options().commands,
                ).await {
                    error!("Failed to register commands globally: {}", e);
                } else {
                    info!("Successfully registered {} commands globally (may take up to 1 hour to propagate)",
                          framework.options().commands.len());
                }

                Ok(Data {
                    config,
                    catalog,
                    api,
                    selection_manager,
                    verification_manager,
                    greeting_manager,
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::GUILD_MESSAGE_REACTIONS;

    info!("Requesting privileged intents: [\"MESSAGE_CONTENT\", \"GUILD_MEMBERS\"]");

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot...");
    if let Err(e) = client.start().await {
        let err_str = e.to_string();
        if err_str.contains("Disallowed") || err_str.contains("intents") {
            error!("Failed to start bot: {}", e);
            error!("Enable MESSAGE_CONTENT and GUILD_MEMBERS under Bot -> Privileged Gateway Intents at https://discord.com/developers/applications");
            return Err(anyhow::anyhow!("Disallowed gateway intents: {}", e));
        }
        error!("Failed to login: {}", e);
        return Err(e.into());
    }
    warn!("Bot ended.");

    Ok(())
}
