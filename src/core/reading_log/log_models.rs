use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// What kind of media a log entry counts.
///
/// Each type has its own unit (pages, episodes, characters, minutes) and the
/// scoring engine weighs them into comparable points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    Book,
    Manga,
    VisualNovel,
    Anime,
    RawReading,
    ReadTime,
    Listening,
}

impl MediaType {
    pub const ALL: [MediaType; 7] = [
        MediaType::Book,
        MediaType::Manga,
        MediaType::VisualNovel,
        MediaType::Anime,
        MediaType::RawReading,
        MediaType::ReadTime,
        MediaType::Listening,
    ];

    /// Value stored in the `logs.media_type` column.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            MediaType::Book => "BOOK",
            MediaType::Manga => "MANGA",
            MediaType::VisualNovel => "VN",
            MediaType::Anime => "ANIME",
            MediaType::RawReading => "READING",
            MediaType::ReadTime => "READTIME",
            MediaType::Listening => "LISTENING",
        }
    }

    /// Strict parse of a stored column value.
    pub fn from_db_str(value: &str) -> Option<Self> {
        MediaType::ALL.into_iter().find(|m| m.as_db_str() == value)
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaType::Book => "Book",
            MediaType::Manga => "Manga",
            MediaType::VisualNovel => "Visual novel",
            MediaType::Anime => "Anime",
            MediaType::RawReading => "Reading",
            MediaType::ReadTime => "Read time",
            MediaType::Listening => "Listening",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            MediaType::Book => "books",
            MediaType::Manga => "pages",
            MediaType::VisualNovel | MediaType::RawReading => "characters",
            MediaType::Anime => "episodes",
            MediaType::ReadTime | MediaType::Listening => "minutes",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Error)]
#[error("Unknown media type '{0}'. Try book, manga, vn, anime, reading, readtime or listening.")]
pub struct MediaTypeParseError(pub String);

/// Lenient parse for user input: case-insensitive, with a few aliases.
impl FromStr for MediaType {
    type Err = MediaTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "book" | "books" => Ok(MediaType::Book),
            "manga" => Ok(MediaType::Manga),
            "vn" | "visual_novel" | "visualnovel" => Ok(MediaType::VisualNovel),
            "anime" => Ok(MediaType::Anime),
            "reading" | "raw_reading" | "rawreading" => Ok(MediaType::RawReading),
            "readtime" | "read_time" => Ok(MediaType::ReadTime),
            "listening" | "listen" => Ok(MediaType::Listening),
            _ => Err(MediaTypeParseError(s.to_string())),
        }
    }
}

/// Window of log entries a leaderboard aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeframe {
    #[default]
    AllTime,
    /// From the first day of the current calendar month.
    Month,
    /// Entries logged on the same weekday as today, in any week.
    Week,
}

impl Timeframe {
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::AllTime => "All time",
            Timeframe::Month => "This month",
            Timeframe::Week => "This weekday",
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Unknown timeframe '{0}'. Use all, month or week.")]
pub struct TimeframeParseError(pub String);

impl FromStr for Timeframe {
    type Err = TimeframeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "alltime" | "all_time" => Ok(Timeframe::AllTime),
            "month" | "monthly" => Ok(Timeframe::Month),
            "week" | "weekly" => Ok(Timeframe::Week),
            _ => Err(TimeframeParseError(s.to_string())),
        }
    }
}

/// One consumption ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub guild_id: u64,
    pub user_id: u64,
    pub media_type: MediaType,
    pub amount: f64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Parameters of a leaderboard query.
#[derive(Debug, Clone)]
pub struct LeaderboardQuery {
    pub guild_id: u64,
    /// The user whose neighbourhood is always included.
    pub user_id: u64,
    pub timeframe: Timeframe,
    pub media_type: Option<MediaType>,
    /// Every row ranked at or above this is included.
    pub top: u32,
    /// Reference point for the month and weekday filters.
    pub now: DateTime<Utc>,
}

/// A ranked row of the weighted leaderboard.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub user_id: u64,
    pub total: f64,
    pub rank: u32,
}
