// Discord commands for reading clubs, books and who finished what.
//
// Same pattern as every command file:
// 1. Extract ids and codes from Discord types
// 2. Call the club service
// 3. Turn the result (or a domain rejection) into a reply
//
// Mutating commands also refresh the affected scoreboard boards.

use super::permissions::require_admin;
use super::{chunk_lines, Context, Error};
use crate::core::boards::{format_points, BoardTarget};
use crate::core::clubs::{ClubError, Credit, NewBook};
use crate::discord::boards::refresh_board;
use chrono::NaiveDate;
use poise::serenity_prelude as serenity;
use poise::serenity_prelude::Mentionable;

const MONTH_FORMAT: &str = "%b %Y";
const SCOREBOARD_ROWS: usize = 20;
const EMBED_FIELD_LIMIT: usize = 25;
const MESSAGE_LIMIT: usize = 2000;
const MAX_EMBEDS: usize = 10;
const FIELD_VALUE_LIMIT: usize = 1024;
const CLUB_COLOR: u32 = 0x5865F2;

fn require_guild(ctx: &Context<'_>) -> Result<u64, Error> {
    Ok(ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get())
}

/// Domain rejections become a plain reply. Storage failures propagate to the
/// framework error handler.
async fn reply_rejection(ctx: Context<'_>, err: ClubError) -> Result<(), Error> {
    match err {
        ClubError::Storage(_) => Err(err.into()),
        rejection => {
            ctx.say(rejection.to_string()).await?;
            Ok(())
        }
    }
}

/// Create a new reading club.
#[poise::command(prefix_command, guild_only)]
pub async fn new_club(
    ctx: Context<'_>,
    #[description = "Club name (quote it if it has spaces)"] name: String,
    #[description = "Short club code"] code: String,
) -> Result<(), Error> {
    if !require_admin(ctx).await? {
        return Ok(());
    }
    let guild_id = require_guild(&ctx)?;

    match ctx.data().clubs.create_club(guild_id, &name, &code).await {
        Ok(club) => {
            ctx.say(format!(
                "New club \"{}\" created with code {}",
                club.name, club.code
            ))
            .await?;
            Ok(())
        }
        Err(err) => reply_rejection(ctx, err).await,
    }
}

/// Add a book to a club.
#[poise::command(prefix_command, guild_only)]
pub async fn new_book(
    ctx: Context<'_>,
    #[description = "Club code"] club_code: String,
    #[description = "Book name (quote it if it has spaces)"] name: String,
    #[description = "Short book code"] code: String,
    #[description = "Points for finishing (default 2)"] points: Option<f64>,
    #[description = "Pick date as YYYY-MM-DD (default today)"] created_at: Option<NaiveDate>,
) -> Result<(), Error> {
    if !require_admin(ctx).await? {
        return Ok(());
    }
    let guild_id = require_guild(&ctx)?;

    let input = NewBook {
        club_code,
        name,
        code,
        points,
        created_at,
    };

    let book = match ctx.data().clubs.add_book(guild_id, input).await {
        Ok(book) => book,
        Err(err) => return reply_rejection(ctx, err).await,
    };

    ctx.say(format!(
        "New book \"{}\" added with code {} worth {} points",
        book.name,
        book.code,
        format_points(book.points)
    ))
    .await?;

    refresh_board(
        ctx.serenity_context(),
        ctx.data(),
        guild_id,
        &BoardTarget::club(&book.club_code),
    )
    .await
}

/// Delete a book and everyone's completion of it.
#[poise::command(prefix_command, guild_only)]
pub async fn delete_book(
    ctx: Context<'_>,
    #[description = "Book code"] code: String,
) -> Result<(), Error> {
    if !require_admin(ctx).await? {
        return Ok(());
    }
    let guild_id = require_guild(&ctx)?;

    let book = match ctx.data().clubs.delete_book(guild_id, &code).await {
        Ok(book) => book,
        Err(ClubError::UnknownBook(_)) => {
            ctx.say("No such book exists!").await?;
            return Ok(());
        }
        Err(err) => return reply_rejection(ctx, err).await,
    };

    ctx.say(format!("Deleted book {}", book.code)).await?;

    refresh_board(
        ctx.serenity_context(),
        ctx.data(),
        guild_id,
        &BoardTarget::club(&book.club_code),
    )
    .await
}

/// Mark a book as finished by a member.
#[poise::command(prefix_command, guild_only)]
pub async fn finished(
    ctx: Context<'_>,
    #[description = "Member who finished the book"] member: serenity::Member,
    #[description = "Book code"] book_code: String,
    #[description = "Points to award (default: the book's value)"] points: Option<f64>,
) -> Result<(), Error> {
    if !require_admin(ctx).await? {
        return Ok(());
    }
    let guild_id = require_guild(&ctx)?;
    let user_id = member.user.id.get();

    let result = ctx
        .data()
        .clubs
        .mark_finished(guild_id, user_id, &book_code, points)
        .await;

    let (book, _activity) = match result {
        Ok(finished) => finished,
        Err(ClubError::AlreadyFinished { book_code, .. }) => {
            ctx.say(format!(
                "{} has already finished {}.",
                member.display_name(),
                book_code
            ))
            .await?;
            return Ok(());
        }
        Err(err) => return reply_rejection(ctx, err).await,
    };

    ctx.say(format!("{} has finished {}", member.mention(), book.code))
        .await?;

    let serenity_ctx = ctx.serenity_context();
    refresh_board(
        serenity_ctx,
        ctx.data(),
        guild_id,
        &BoardTarget::club(&book.club_code),
    )
    .await?;
    refresh_board(serenity_ctx, ctx.data(), guild_id, &BoardTarget::All).await
}

/// List a club's books with how many members finished each.
#[poise::command(prefix_command, guild_only)]
pub async fn books(
    ctx: Context<'_>,
    #[description = "Club code"] club_code: String,
) -> Result<(), Error> {
    let guild_id = require_guild(&ctx)?;

    let overview = match ctx.data().clubs.club_overview(guild_id, &club_code).await {
        Ok(overview) => overview,
        Err(err) => return reply_rejection(ctx, err).await,
    };

    let fields: Vec<(String, String)> = overview
        .books
        .iter()
        .map(|entry| {
            let name = format!(
                "**{} [{}]({})**",
                entry.book.name,
                entry.book.code,
                entry.book.created_at.format(MONTH_FORMAT)
            );
            let value = match entry.reader_count {
                0 => "No members".to_string(),
                count => format!("{} members", count),
            };
            (name, value)
        })
        .collect();

    // Embeds hold at most 25 fields; long clubs spill into more embeds.
    let mut reply = poise::CreateReply::default();
    if fields.is_empty() {
        reply = reply.embed(
            serenity::CreateEmbed::new()
                .title(format!("**{}**", overview.club.name))
                .description("No books yet.")
                .color(CLUB_COLOR),
        );
    }
    for (index, chunk) in fields.chunks(EMBED_FIELD_LIMIT).take(MAX_EMBEDS).enumerate() {
        let title = if index == 0 {
            format!("**{}**", overview.club.name)
        } else {
            format!("**{}** (cont.)", overview.club.name)
        };
        let mut embed = serenity::CreateEmbed::new().title(title).color(CLUB_COLOR);
        for (name, value) in chunk {
            embed = embed.field(name, value, false);
        }
        reply = reply.embed(embed);
    }

    ctx.send(reply).await?;
    Ok(())
}

/// List a club's members with their books and points.
#[poise::command(prefix_command, guild_only)]
pub async fn users(
    ctx: Context<'_>,
    #[description = "Club code"] club_code: String,
) -> Result<(), Error> {
    let guild_id = require_guild(&ctx)?;

    let (club, members) = match ctx.data().clubs.club_members(guild_id, &club_code).await {
        Ok(result) => result,
        Err(err) => return reply_rejection(ctx, err).await,
    };

    if members.is_empty() {
        ctx.say(format!("Nobody has finished a {} book yet.", club.code))
            .await?;
        return Ok(());
    }

    let lines: Vec<String> = members
        .iter()
        .map(|member| {
            let books = member
                .books
                .iter()
                .map(|(code, points)| format!("{}({})", code, format_points(*points)))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "<@!{}>: {}: **{} pts**",
                member.user_id,
                books,
                format_points(member.total_points)
            )
        })
        .collect();

    for chunk in chunk_lines(&lines, MESSAGE_LIMIT) {
        ctx.say(chunk).await?;
    }
    Ok(())
}

/// Show everything one user has finished.
#[poise::command(prefix_command, guild_only)]
pub async fn user(
    ctx: Context<'_>,
    #[description = "Discord user id"] user_id: u64,
) -> Result<(), Error> {
    let guild_id = require_guild(&ctx)?;

    let overview = match ctx.data().clubs.user_overview(guild_id, user_id).await {
        Ok(Some(overview)) => overview,
        Ok(None) => {
            ctx.say(format!("<@!{}> hasn't finished any books yet.", user_id))
                .await?;
            return Ok(());
        }
        Err(err) => return reply_rejection(ctx, err).await,
    };

    let mut embed = serenity::CreateEmbed::new()
        .color(CLUB_COLOR)
        .field("User", format!("<@!{}>", overview.user_id), false)
        .field("Books", overview.book_count.to_string(), true)
        .field("Points", format_points(overview.total_points), true);

    let mut fields = Vec::new();
    for (club_code, activities) in &overview.by_club {
        let lines = activities
            .iter()
            .map(|activity| {
                let marker = match activity.credit() {
                    Credit::Full => "",
                    Credit::Partial => " [partial]",
                    Credit::Extra => " [extra]",
                };
                format!(
                    "{}: {}{}",
                    activity.book_code,
                    format_points(activity.points),
                    marker
                )
            })
            .collect::<Vec<_>>();
        fields.extend(club_fields(club_code, &lines));
    }
    for (name, value) in fields.into_iter().take(EMBED_FIELD_LIMIT - 3) {
        embed = embed.field(name, value, false);
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// One embed field per club, continued in further fields past Discord's
/// value limit.
fn club_fields(club_code: &str, lines: &[String]) -> Vec<(String, String)> {
    chunk_lines(lines, FIELD_VALUE_LIMIT)
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let name = if i == 0 {
                club_code.to_string()
            } else {
                format!("{} (cont.)", club_code)
            };
            (name, chunk)
        })
        .collect()
}

/// Show the club scoreboard, guild-wide or for one club.
#[poise::command(prefix_command, guild_only)]
pub async fn score(
    ctx: Context<'_>,
    #[description = "Club code (all clubs except VN when omitted)"] club_code: Option<String>,
) -> Result<(), Error> {
    let guild_id = require_guild(&ctx)?;

    let (club, standings) = match ctx
        .data()
        .clubs
        .scoreboard(guild_id, club_code.as_deref())
        .await
    {
        Ok(result) => result,
        Err(err) => return reply_rejection(ctx, err).await,
    };

    let name = match club {
        Some(club) => club.name,
        None => ctx
            .guild()
            .map(|guild| guild.name.clone())
            .unwrap_or_else(|| "Server".to_string()),
    };

    let description = if standings.is_empty() {
        "No points yet.".to_string()
    } else {
        standings
            .iter()
            .take(SCOREBOARD_ROWS)
            .map(|s| format!("<@!{}>: {} pts", s.user_id, format_points(s.points)))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let embed = serenity::CreateEmbed::new()
        .title(format!("**{} Scoreboard**", name))
        .description(description)
        .color(CLUB_COLOR);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show a book's club, points, month and readers.
#[poise::command(prefix_command, guild_only)]
pub async fn book(
    ctx: Context<'_>,
    #[description = "Book code"] book_code: String,
) -> Result<(), Error> {
    let guild_id = require_guild(&ctx)?;

    let details = match ctx.data().clubs.book_details(guild_id, &book_code).await {
        Ok(details) => details,
        Err(err) => return reply_rejection(ctx, err).await,
    };

    let readers = if details.readers.is_empty() {
        "Nobody yet".to_string()
    } else {
        let mentions = details
            .readers
            .iter()
            .map(|id| format!("<@!{}>", id))
            .collect::<Vec<_>>()
            .join(", ");
        // Field values are capped at 1024 characters.
        if mentions.len() > 1024 {
            format!("{} readers", details.readers.len())
        } else {
            mentions
        }
    };

    let embed = serenity::CreateEmbed::new()
        .title(format!("**{}** [{}]", details.book.name, details.book.code))
        .color(CLUB_COLOR)
        .field("Club", &details.book.club_code, true)
        .field("Points", format_points(details.book.points), true)
        .field(
            "Month",
            details.book.created_at.format(MONTH_FORMAT).to_string(),
            true,
        )
        .field("Readers", details.readers.len().to_string(), true)
        .field("Users", readers, false);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
