// Discord commands for the media log and its weighted leaderboard.

use super::{Context, Error};
use crate::core::boards::format_points;
use crate::core::reading_log::{LogError, MediaType, Timeframe};
use crate::core::scoring::points_for;
use poise::serenity_prelude as serenity;

const HISTORY_LIMIT: u32 = 10;
const LOG_COLOR: u32 = 0x2ECC71;

fn require_guild(ctx: &Context<'_>) -> Result<u64, Error> {
    Ok(ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get())
}

/// Log some reading, watching or listening.
#[poise::command(prefix_command, guild_only)]
pub async fn log(
    ctx: Context<'_>,
    #[description = "book, manga, vn, anime, reading, readtime or listening"]
    media_type: MediaType,
    #[description = "How much (pages, episodes, characters, minutes...)"] amount: f64,
    #[description = "Optional note"]
    #[rest]
    note: Option<String>,
) -> Result<(), Error> {
    let guild_id = require_guild(&ctx)?;
    let user_id = ctx.author().id.get();

    let entry = match ctx
        .data()
        .reading_log
        .log(guild_id, user_id, media_type, amount, note)
        .await
    {
        Ok(entry) => entry,
        Err(err @ LogError::InvalidAmount(_)) => {
            ctx.say(err.to_string()).await?;
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    ctx.say(format!(
        "Logged {} {} of {} ({} pts)",
        format_points(entry.amount),
        entry.media_type.unit(),
        entry.media_type,
        format_points(points_for(entry.media_type, entry.amount))
    ))
    .await?;
    Ok(())
}

/// Remove your most recent log entry.
#[poise::command(prefix_command, guild_only)]
pub async fn undo(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = require_guild(&ctx)?;
    let user_id = ctx.author().id.get();

    if ctx.data().reading_log.undo_latest(guild_id, user_id).await? {
        ctx.say("Removed your latest log entry.").await?;
    } else {
        ctx.say("You have no log entries to undo.").await?;
    }
    Ok(())
}

/// Remove all of your log entries.
#[poise::command(prefix_command, guild_only)]
pub async fn clear_logs(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = require_guild(&ctx)?;
    let user_id = ctx.author().id.get();

    let removed = ctx.data().reading_log.clear(guild_id, user_id).await?;
    ctx.say(format!("Cleared {} log entries.", removed)).await?;
    Ok(())
}

/// Show recent log entries and weighted totals.
#[poise::command(prefix_command, guild_only)]
pub async fn logs(
    ctx: Context<'_>,
    #[description = "Member to check (defaults to you)"] member: Option<serenity::Member>,
) -> Result<(), Error> {
    let guild_id = require_guild(&ctx)?;
    let (user_id, name) = match &member {
        Some(member) => (member.user.id.get(), member.display_name().to_string()),
        None => (ctx.author().id.get(), ctx.author().name.clone()),
    };

    let service = &ctx.data().reading_log;
    let history = service.history(guild_id, user_id, HISTORY_LIMIT).await?;
    if history.is_empty() {
        ctx.say(format!("{} hasn't logged anything yet.", name)).await?;
        return Ok(());
    }
    let summary = service.summary(guild_id, user_id).await?;

    let recent = history
        .iter()
        .map(|entry| {
            let mut line = format!(
                "`{}` {}: {} {} ({} pts)",
                entry.created_at.format("%Y-%m-%d"),
                entry.media_type,
                format_points(entry.amount),
                entry.media_type.unit(),
                format_points(points_for(entry.media_type, entry.amount))
            );
            if let Some(note) = &entry.note {
                line.push_str(&format!(" - {}", note));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("{}'s log", name))
        .description(recent)
        .color(LOG_COLOR);

    for (media, amount, points) in &summary.by_media {
        embed = embed.field(
            media.label(),
            format!(
                "{} {}\n{} pts",
                format_points(*amount),
                media.unit(),
                format_points(*points)
            ),
            true,
        );
    }

    embed = embed
        .field(
            "Total",
            format!(
                "**{} pts** over {} entries",
                format_points(summary.total_points),
                summary.entry_count
            ),
            false,
        )
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Showing the last {} entries",
            history.len()
        )));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Weighted leaderboard: the top 20 plus the ranks around you.
#[poise::command(prefix_command, guild_only)]
pub async fn leaderboard(
    ctx: Context<'_>,
    #[description = "all, month or week"] timeframe: Option<Timeframe>,
    #[description = "Only count one media type"] media_type: Option<MediaType>,
) -> Result<(), Error> {
    let guild_id = require_guild(&ctx)?;
    let user_id = ctx.author().id.get();
    let timeframe = timeframe.unwrap_or_default();

    let entries = ctx
        .data()
        .reading_log
        .leaderboard(guild_id, user_id, timeframe, media_type)
        .await?;

    let title = match media_type {
        Some(media) => format!("{} leaderboard: {}", timeframe.label(), media),
        None => format!("{} leaderboard", timeframe.label()),
    };

    let description = if entries.is_empty() {
        "Nobody has logged anything for this period.".to_string()
    } else {
        let mut lines = Vec::with_capacity(entries.len() + 1);
        let mut gap_marked = false;
        for (index, entry) in entries.iter().enumerate() {
            // Rows are hidden between the top and the caller's neighbourhood
            // when more users rank ahead than were listed so far.
            if !gap_marked && entry.rank as usize > index + 1 {
                lines.push("...".to_string());
                gap_marked = true;
            }

            let line = format!(
                "{}. <@!{}>: {} pts",
                entry.rank,
                entry.user_id,
                format_points(entry.total)
            );
            if entry.user_id == user_id {
                lines.push(format!("**{}**", line));
            } else {
                lines.push(line);
            }
        }
        lines.join("\n")
    };

    let embed = serenity::CreateEmbed::new()
        .title(title)
        .description(description)
        .color(LOG_COLOR);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
