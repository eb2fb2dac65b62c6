// Re-renders the fixed scoreboard messages in the board channel.
//
// The text comes from `core::boards`; this file only looks up member names
// and edits the message in place.

use crate::core::boards::{
    render_board, BoardRow, BoardTarget, BOARD_ROWS, PAST_PICKS_LIMIT, UNKNOWN_MEMBER,
};
use crate::core::clubs::ScoreboardScope;
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

/// Refresh one board. A target without a configured message is skipped.
pub async fn refresh_board(
    ctx: &serenity::Context,
    data: &Data,
    guild_id: u64,
    target: &BoardTarget,
) -> Result<(), Error> {
    let slots = &data.config.boards;
    let message_id = match slots.message_for(target) {
        Some(id) if slots.channel_id != 0 && id != 0 => id,
        _ => {
            tracing::debug!(guild_id, board = %target, "No board message configured, skipping");
            return Ok(());
        }
    };

    let scope = ScoreboardScope::for_club(target.club_code());
    let standings = data.clubs.standings(guild_id, &scope).await?;

    // Sequential on purpose: one member lookup at a time.
    let mut rows = Vec::with_capacity(BOARD_ROWS);
    for standing in standings.iter().take(BOARD_ROWS) {
        rows.push(BoardRow {
            rank: standing.rank,
            display_name: member_name(ctx, guild_id, standing.user_id).await,
            points: standing.points,
        });
    }

    let past_picks = match target.club_code() {
        Some(code) => data.clubs.past_picks(guild_id, code, PAST_PICKS_LIMIT).await?,
        None => Vec::new(),
    };

    let rendered = render_board(target, &rows, &past_picks);

    let embed = serenity::CreateEmbed::new()
        .title(rendered.title)
        .description(rendered.description)
        .color(0x5865F2);

    serenity::ChannelId::new(slots.channel_id)
        .edit_message(
            ctx,
            serenity::MessageId::new(message_id),
            serenity::EditMessage::new()
                .content(rendered.content)
                .embed(embed),
        )
        .await?;

    tracing::info!(guild_id, board = %target, rows = rows.len(), "Board refreshed");
    Ok(())
}

/// Refresh each target in turn, logging failures instead of stopping.
pub async fn refresh_boards(
    ctx: &serenity::Context,
    data: &Data,
    guild_id: u64,
    targets: &[BoardTarget],
) {
    for target in targets {
        if let Err(e) = refresh_board(ctx, data, guild_id, target).await {
            tracing::warn!(guild_id, board = %target, "Failed to refresh board: {}", e);
        }
    }
}

/// Refresh every configured board. Used at startup.
pub async fn refresh_all(ctx: &serenity::Context, data: &Data, guild_id: u64) {
    let targets = data.config.boards.targets();
    tracing::info!(guild_id, boards = targets.len(), "Refreshing all boards");
    refresh_boards(ctx, data, guild_id, &targets).await;
}

/// Display name of a guild member, or `Unknown` when the lookup fails
/// (left the server, deleted account, missing permissions).
async fn member_name(ctx: &serenity::Context, guild_id: u64, user_id: u64) -> String {
    let guild_id_s = serenity::GuildId::new(guild_id);
    let user_id_s = serenity::UserId::new(user_id);

    match guild_id_s.member(ctx, user_id_s).await {
        Ok(member) => member.display_name().to_string(),
        Err(e) => {
            tracing::debug!(guild_id, user_id, "Member lookup failed: {}", e);
            UNKNOWN_MEMBER.to_string()
        }
    }
}
