// Reading log - a generic media consumption ledger feeding the weighted
// leaderboard. Independent of clubs and books.

mod log_models;
mod log_service;

pub use log_models::{LeaderboardEntry, LeaderboardQuery, LogEntry, MediaType, Timeframe};
pub use log_service::{LogError, LogStore, ReadingLogService};
