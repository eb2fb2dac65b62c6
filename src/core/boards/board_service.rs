// Scoreboard boards: fixed Discord messages that get re-rendered whenever a
// club's standings change.
//
// This file only decides WHAT a board says. Fetching display names and
// editing the message is Discord glue and lives in `discord/boards`.

use crate::core::clubs::{normalize_code, Book};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Rows shown on a board.
pub const BOARD_ROWS: usize = 10;

/// Past picks listed under a club board.
pub const PAST_PICKS_LIMIT: usize = 50;

/// Label used when a member can no longer be resolved.
pub const UNKNOWN_MEMBER: &str = "Unknown";

/// Which scoreboard a board shows.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum BoardTarget {
    /// The guild-wide rollup.
    All,
    Club(String),
}

impl BoardTarget {
    pub fn club(code: &str) -> Self {
        BoardTarget::Club(normalize_code(code))
    }

    /// `ALL` (any case) names the rollup, anything else a club.
    pub fn from_code(code: &str) -> Self {
        let code = normalize_code(code);
        if code == "ALL" {
            BoardTarget::All
        } else {
            BoardTarget::Club(code)
        }
    }

    pub fn club_code(&self) -> Option<&str> {
        match self {
            BoardTarget::All => None,
            BoardTarget::Club(code) => Some(code),
        }
    }
}

impl fmt::Display for BoardTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardTarget::All => f.write_str("All"),
            BoardTarget::Club(code) => f.write_str(code),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BoardSlotsError {
    #[error("Board entry '{0}' must look like CODE=message_id")]
    MalformedEntry(String),
    #[error("Board entry '{entry}' has an invalid message id")]
    InvalidMessageId { entry: String },
}

/// Where each board lives: one message per target, all in one channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardSlots {
    pub channel_id: u64,
    slots: BTreeMap<BoardTarget, u64>,
}

impl BoardSlots {
    pub fn new(channel_id: u64) -> Self {
        Self {
            channel_id,
            slots: BTreeMap::new(),
        }
    }

    pub fn with_slot(mut self, target: BoardTarget, message_id: u64) -> Self {
        self.slots.insert(target, message_id);
        self
    }

    /// Parse `CODE=message_id` pairs separated by commas. `ALL` names the
    /// guild-wide board.
    pub fn parse(channel_id: u64, spec: &str) -> Result<Self, BoardSlotsError> {
        let mut slots = BoardSlots::new(channel_id);

        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (code, message_id) = entry
                .split_once('=')
                .ok_or_else(|| BoardSlotsError::MalformedEntry(entry.to_string()))?;

            let code = code.trim();
            if code.is_empty() {
                return Err(BoardSlotsError::MalformedEntry(entry.to_string()));
            }

            let message_id: u64 = message_id.trim().parse().map_err(|_| {
                BoardSlotsError::InvalidMessageId {
                    entry: entry.to_string(),
                }
            })?;

            slots = slots.with_slot(BoardTarget::from_code(code), message_id);
        }

        Ok(slots)
    }

    pub fn message_for(&self, target: &BoardTarget) -> Option<u64> {
        self.slots.get(target).copied()
    }

    /// Every configured target, clubs first and the rollup last.
    pub fn targets(&self) -> Vec<BoardTarget> {
        let mut targets: Vec<BoardTarget> = self
            .slots
            .keys()
            .filter(|t| **t != BoardTarget::All)
            .cloned()
            .collect();
        if self.slots.contains_key(&BoardTarget::All) {
            targets.push(BoardTarget::All);
        }
        targets
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// One line of a board, with the display name already resolved.
#[derive(Debug, Clone)]
pub struct BoardRow {
    pub rank: u32,
    pub display_name: String,
    pub points: f64,
}

/// Final text of a board message.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBoard {
    pub title: String,
    pub description: String,
    /// Plain message content above the embed.
    pub content: String,
}

pub fn render_board(target: &BoardTarget, rows: &[BoardRow], past_picks: &[Book]) -> RenderedBoard {
    let title = format!("**{} Scoreboard**", target);

    let description = rows
        .iter()
        .take(BOARD_ROWS)
        .map(|row| {
            format!(
                "**{} {}**: {}pts",
                make_ordinal(row.rank),
                row.display_name,
                millify(row.points)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let content = match target {
        BoardTarget::All => String::new(),
        BoardTarget::Club(_) => {
            let picks = past_picks
                .iter()
                .take(PAST_PICKS_LIMIT)
                .map(|b| format!("**{}**[{}]", b.name, b.code))
                .collect::<Vec<_>>()
                .join(", ");
            format!("Past picks: {}", picks)
        }
    };

    RenderedBoard {
        title,
        description,
        content,
    }
}

/// 1 -> "1st", 12 -> "12th", 23 -> "23rd".
pub fn make_ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

/// Abbreviate large point values: 950 -> "950", 1234 -> "1.2K", 2500000 -> "2.5M".
pub fn millify(value: f64) -> String {
    const SUFFIXES: [&str; 5] = ["", "K", "M", "B", "T"];

    let mut scaled = value;
    let mut index = 0;
    while scaled.abs() >= 1000.0 && index < SUFFIXES.len() - 1 {
        scaled /= 1000.0;
        index += 1;
    }

    let rounded = if index == 0 {
        format!("{:.2}", scaled)
    } else {
        format!("{:.1}", scaled)
    };
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{}{}", trimmed, SUFFIXES[index])
}

/// Format a point value the way replies show it: no trailing zeros.
pub fn format_points(value: f64) -> String {
    let rounded = format!("{:.2}", value);
    rounded
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn book(code: &str) -> Book {
        Book {
            guild_id: 1,
            code: code.to_string(),
            name: format!("Name {code}"),
            club_code: "NOVEL".to_string(),
            points: 2.0,
            created_at: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_make_ordinal() {
        assert_eq!(make_ordinal(1), "1st");
        assert_eq!(make_ordinal(2), "2nd");
        assert_eq!(make_ordinal(3), "3rd");
        assert_eq!(make_ordinal(4), "4th");
        assert_eq!(make_ordinal(11), "11th");
        assert_eq!(make_ordinal(12), "12th");
        assert_eq!(make_ordinal(13), "13th");
        assert_eq!(make_ordinal(21), "21st");
        assert_eq!(make_ordinal(112), "112th");
    }

    #[test]
    fn test_millify() {
        assert_eq!(millify(0.0), "0");
        assert_eq!(millify(2.5), "2.5");
        assert_eq!(millify(950.0), "950");
        assert_eq!(millify(1234.0), "1.2K");
        assert_eq!(millify(1000.0), "1K");
        assert_eq!(millify(2_500_000.0), "2.5M");
    }

    #[test]
    fn test_format_points() {
        assert_eq!(format_points(2.0), "2");
        assert_eq!(format_points(0.5), "0.5");
        assert_eq!(format_points(1.0 / 3.0), "0.33");
    }

    #[test]
    fn test_parse_slots() {
        let slots = BoardSlots::parse(99, "vn3=11, MANGA=12,ALL=13").unwrap();
        assert_eq!(slots.channel_id, 99);
        assert_eq!(slots.message_for(&BoardTarget::club("VN3")), Some(11));
        assert_eq!(slots.message_for(&BoardTarget::All), Some(13));
        assert_eq!(slots.message_for(&BoardTarget::club("JOSEI")), None);
        assert_eq!(
            slots.targets(),
            vec![
                BoardTarget::club("MANGA"),
                BoardTarget::club("VN3"),
                BoardTarget::All
            ]
        );
    }

    #[test]
    fn test_parse_slots_errors() {
        assert!(BoardSlots::parse(1, "").unwrap().is_empty());
        assert_eq!(
            BoardSlots::parse(1, "VN3"),
            Err(BoardSlotsError::MalformedEntry("VN3".to_string()))
        );
        assert!(matches!(
            BoardSlots::parse(1, "VN3=abc"),
            Err(BoardSlotsError::InvalidMessageId { .. })
        ));
    }

    #[test]
    fn test_render_club_board() {
        let rows: Vec<BoardRow> = (1..=12)
            .map(|i| BoardRow {
                rank: i,
                display_name: format!("user{i}"),
                points: 1500.0 / i as f64,
            })
            .collect();
        let picks: Vec<Book> = (0..60).map(|i| book(&format!("B{i}"))).collect();

        let board = render_board(&BoardTarget::club("novel"), &rows, &picks);
        assert_eq!(board.title, "**NOVEL Scoreboard**");
        assert_eq!(board.description.lines().count(), BOARD_ROWS);
        assert!(board.description.starts_with("**1st user1**: 1.5Kpts"));
        assert!(board.content.starts_with("Past picks: **Name B0**[B0], "));
        assert_eq!(board.content.matches("**[").count(), PAST_PICKS_LIMIT);
    }

    #[test]
    fn test_render_rollup_has_no_picks() {
        let rows = vec![BoardRow {
            rank: 1,
            display_name: UNKNOWN_MEMBER.to_string(),
            points: 4.0,
        }];
        let board = render_board(&BoardTarget::All, &rows, &[]);
        assert_eq!(board.title, "**All Scoreboard**");
        assert_eq!(board.description, "**1st Unknown**: 4pts");
        assert!(board.content.is_empty());
    }
}
