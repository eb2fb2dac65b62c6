// This is the entry point of the book club bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (SQLite)
// - `discord/` = Discord-specific adapters (commands, boards)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Refresh the scoreboard boards once the bot is ready

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use crate::config::AppConfig;
use crate::core::clubs::ClubService;
use crate::core::reading_log::ReadingLogService;
use crate::discord::{Data, Error};
use crate::infra::clubs::SqliteClubStore;
use crate::infra::database;
use crate::infra::reading_log::SqliteReadingLogStore;
use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Command failures are logged; everything else goes to poise's default
/// handler, which replies with usage hints for bad arguments.
async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!(
                command = %ctx.command().qualified_name,
                user_id = ctx.author().id.get(),
                "Command failed: {}",
                error
            );
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                tracing::error!("Error while handling error: {}", e);
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!(
        environment = ?config.environment,
        database = %config.database_path,
        boards = config.boards.targets().len(),
        "Configuration loaded"
    );

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // One pool, two stores, two services.

    let pool = database::connect(&config.database_path)
        .await
        .context("Failed to open the SQLite database")?;

    let club_store = SqliteClubStore::new(pool.clone());
    club_store
        .migrate()
        .await
        .context("Failed to migrate club tables")?;

    let log_store = SqliteReadingLogStore::new(pool);
    log_store
        .migrate()
        .await
        .context("Failed to migrate log tables")?;

    let data = Data {
        clubs: Arc::new(ClubService::new(club_store)),
        reading_log: Arc::new(ReadingLogService::new(log_store)),
        config: Arc::clone(&config),
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read prefix commands
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: discord::commands::all(),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(config.command_prefix.clone()),
                ..Default::default()
            },
            on_error: |error| Box::pin(on_error(error)),
            // Score lists mention members; don't ping them.
            allowed_mentions: Some(
                serenity::CreateAllowedMentions::new()
                    .all_users(false)
                    .all_roles(false),
            ),
            ..Default::default()
        })
        .setup(|ctx, ready, _framework| {
            Box::pin(async move {
                tracing::info!(user = %ready.user.name, "Bot is ready");

                if let Some(guild_id) = data.config.board_guild_id {
                    discord::boards::refresh_all(ctx, &data, guild_id).await;
                }

                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await
        .context("Error creating client")?;

    client.start().await.context("Error running bot")?;
    Ok(())
}
