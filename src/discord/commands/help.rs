use super::{Context, Error};
use poise::serenity_prelude as serenity;
use std::collections::HashMap;

// Category definitions in display order
const CATEGORY_ORDER: &[&str] = &["Clubs", "Reading Log", "Club Admin", "Utilities"];

fn get_category_emoji(category: &str) -> &'static str {
    match category {
        "Clubs" => "📚",
        "Reading Log" => "📝",
        "Club Admin" => "🛠️",
        "Utilities" => "🧰",
        _ => "•",
    }
}

struct CommandMetadata {
    category: &'static str,
    priority: i32,
    usage: &'static str,
}

fn get_command_metadata(name: &str) -> CommandMetadata {
    let (category, priority, usage) = match name {
        "score" => ("Clubs", 100, "[club_code]"),
        "books" => ("Clubs", 90, "<club_code>"),
        "book" => ("Clubs", 80, "<book_code>"),
        "users" => ("Clubs", 70, "<club_code>"),
        "user" => ("Clubs", 60, "<user_id>"),
        "log" => ("Reading Log", 100, "<media_type> <amount> [note...]"),
        "logs" => ("Reading Log", 90, "[member]"),
        "leaderboard" => ("Reading Log", 80, "[all|month|week] [media_type]"),
        "undo" => ("Reading Log", 70, ""),
        "clear_logs" => ("Reading Log", 60, ""),
        "new_club" => ("Club Admin", 100, "<name> <code>"),
        "new_book" => ("Club Admin", 90, "<club_code> <name> <code> [points] [YYYY-MM-DD]"),
        "finished" => ("Club Admin", 80, "<member> <book_code> [points]"),
        "delete_book" => ("Club Admin", 70, "<book_code>"),
        _ => ("Utilities", 0, ""),
    };

    CommandMetadata {
        category,
        priority,
        usage,
    }
}

/// Show a categorized list of commands, or details for one command.
#[poise::command(prefix_command)]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Command to explain"] command: Option<String>,
) -> Result<(), Error> {
    if command.is_some() {
        let config = poise::builtins::HelpConfiguration {
            extra_text_at_bottom: "Codes are case-insensitive.",
            ..Default::default()
        };
        poise::builtins::help(ctx, command.as_deref(), config).await?;
        return Ok(());
    }

    let prefix = &ctx.data().config.command_prefix;
    let mut categories: HashMap<&str, Vec<(i32, String)>> = HashMap::new();

    for command in &ctx.framework().options().commands {
        if command.hide_in_help || command.name == "help" {
            continue;
        }

        let metadata = get_command_metadata(&command.name);
        let description = command
            .description
            .as_deref()
            .unwrap_or("No description provided.");

        let mut entry = format!("• **{}{}**", prefix, command.name);
        if !metadata.usage.is_empty() {
            entry.push_str(&format!(" `{}`", metadata.usage));
        }
        entry.push_str(&format!("\n  {}", description));

        categories
            .entry(metadata.category)
            .or_default()
            .push((metadata.priority, entry));
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("Book Club Commands")
        .description(format!(
            "Every command starts with `{}`. Admin commands need a club admin role.",
            prefix.trim_end()
        ))
        .color(serenity::Colour::from_rgb(88, 101, 242));

    let mut sorted_categories: Vec<_> = categories.keys().cloned().collect();
    sorted_categories.sort_by(|a, b| {
        let pos_a = CATEGORY_ORDER.iter().position(|&x| x == *a).unwrap_or(999);
        let pos_b = CATEGORY_ORDER.iter().position(|&x| x == *b).unwrap_or(999);
        pos_a.cmp(&pos_b).then(a.cmp(b))
    });

    for category in sorted_categories {
        if let Some(entries) = categories.get_mut(category) {
            // Sort by priority (descending), then name (ascending)
            entries.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

            let title = format!("{} {}", get_category_emoji(category), category);
            let formatted_entries: Vec<String> = entries.iter().map(|(_, s)| s.clone()).collect();

            for (i, chunk) in chunk_entries(&formatted_entries).iter().enumerate() {
                let field_name = if i == 0 {
                    title.clone()
                } else {
                    format!("{} (cont.)", title)
                };

                embed = embed.field(field_name, chunk.join("\n"), false);
            }
        }
    }

    embed = embed.footer(serenity::CreateEmbedFooter::new(format!(
        "{}help <command> for details",
        prefix
    )));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

fn chunk_entries(entries: &[String]) -> Vec<Vec<String>> {
    let mut chunks = Vec::new();
    let mut current_chunk = Vec::new();
    let mut current_length = 0;

    for entry in entries {
        let entry_len = entry.len();
        // Discord field value limit is 1024. We leave a bit of buffer.
        if !current_chunk.is_empty() && current_length + entry_len + 1 > 1000 {
            chunks.push(current_chunk);
            current_chunk = Vec::new();
            current_length = 0;
        }

        current_chunk.push(entry.clone());
        current_length += entry_len + 1; // +1 for newline
    }

    if !current_chunk.is_empty() {
        chunks.push(current_chunk);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_commands_are_grouped() {
        for name in ["new_club", "new_book", "finished", "delete_book"] {
            assert_eq!(get_command_metadata(name).category, "Club Admin");
        }
        assert_eq!(get_command_metadata("leaderboard").category, "Reading Log");
        assert_eq!(get_command_metadata("something_else").category, "Utilities");
    }

    #[test]
    fn test_chunk_entries_splits_long_lists() {
        let entries: Vec<String> = (0..30).map(|i| format!("{i:0>60}")).collect();
        let chunks = chunk_entries(&entries);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.join("\n").len() <= 1000));
        assert_eq!(chunks.concat(), entries);
    }
}
