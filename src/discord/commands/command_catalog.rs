// Discord commands module.
// Each feature gets its own command file.

pub mod clubs;

pub mod reading_log;

pub mod help;

mod permissions;

use crate::config::AppConfig;
use crate::core::clubs::ClubService;
use crate::core::reading_log::ReadingLogService;
use crate::infra::clubs::SqliteClubStore;
use crate::infra::reading_log::SqliteReadingLogStore;
use std::sync::Arc;

/// Type alias for our bot's context.
/// This is what every command receives as its first parameter.
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Data that's shared across all commands.
pub struct Data {
    pub clubs: Arc<ClubService<SqliteClubStore>>,
    pub reading_log: Arc<ReadingLogService<SqliteReadingLogStore>>,
    pub config: Arc<AppConfig>,
}

/// Every command the bot registers, in help order.
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        clubs::new_club(),
        clubs::new_book(),
        clubs::delete_book(),
        clubs::finished(),
        clubs::books(),
        clubs::users(),
        clubs::user(),
        clubs::score(),
        clubs::book(),
        reading_log::log(),
        reading_log::undo(),
        reading_log::clear_logs(),
        reading_log::logs(),
        reading_log::leaderboard(),
        help::help(),
    ]
}

/// Split lines into messages that stay under Discord's 2000 character limit.
pub(crate) fn chunk_lines(lines: &[String], limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in lines {
        if !current.is_empty() && current.len() + line.len() + 1 > limit {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_lines_respects_limit() {
        let lines: Vec<String> = (0..10).map(|i| format!("line {i:02}")).collect();
        let chunks = chunk_lines(&lines, 30);
        assert!(chunks.iter().all(|c| c.len() <= 30));
        assert_eq!(chunks.join("\n"), lines.join("\n"));
    }

    #[test]
    fn test_chunk_lines_empty() {
        assert!(chunk_lines(&[], 2000).is_empty());
    }

    #[test]
    fn test_catalog_names() {
        let names: Vec<String> = all().into_iter().map(|c| c.name).collect();
        for expected in ["new_club", "finished", "score", "leaderboard", "clear_logs", "help"] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
    }
}
