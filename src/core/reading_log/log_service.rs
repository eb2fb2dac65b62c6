use super::log_models::{LeaderboardEntry, LeaderboardQuery, LogEntry, MediaType, Timeframe};
use crate::core::scoring::{points_by_media, total_points};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Rows ranked at or above this always appear on the leaderboard.
pub const LEADERBOARD_TOP: u32 = 20;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("Amount must be a positive number, got {0}")]
    InvalidAmount(f64),

    /// A stored row carries a media type this build doesn't know.
    #[error("Unknown media type '{0}' in the log table")]
    UnknownMediaType(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Persistence for the media log ledger.
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn insert_log(&self, entry: &LogEntry) -> Result<(), LogError>;

    /// A user's entries, newest first.
    async fn logs_by_user(
        &self,
        guild_id: u64,
        user_id: u64,
        limit: Option<u32>,
    ) -> Result<Vec<LogEntry>, LogError>;

    /// Delete the user's most recent entry. Returns rows removed.
    async fn delete_latest(&self, guild_id: u64, user_id: u64) -> Result<u64, LogError>;

    /// Delete every entry of the user. Returns rows removed.
    async fn delete_all(&self, guild_id: u64, user_id: u64) -> Result<u64, LogError>;

    async fn leaderboard(&self, query: &LeaderboardQuery)
        -> Result<Vec<LeaderboardEntry>, LogError>;
}

/// Weighted totals of one user.
#[derive(Debug, Clone)]
pub struct LogSummary {
    pub entry_count: usize,
    pub total_points: f64,
    /// (media type, raw amount, weighted points)
    pub by_media: Vec<(MediaType, f64, f64)>,
}

pub struct ReadingLogService<S: LogStore> {
    store: S,
    clock: fn() -> DateTime<Utc>,
}

impl<S: LogStore> ReadingLogService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: Utc::now,
        }
    }

    /// Build a service with a fixed clock. Used by tests that check the
    /// month and weekday windows.
    #[cfg(test)]
    pub fn new_with_clock(store: S, clock: fn() -> DateTime<Utc>) -> Self {
        Self { store, clock }
    }

    /// Append a ledger entry stamped with the current time.
    pub async fn log(
        &self,
        guild_id: u64,
        user_id: u64,
        media_type: MediaType,
        amount: f64,
        note: Option<String>,
    ) -> Result<LogEntry, LogError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(LogError::InvalidAmount(amount));
        }

        let entry = LogEntry {
            guild_id,
            user_id,
            media_type,
            amount,
            note: note
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            created_at: (self.clock)(),
        };
        self.store.insert_log(&entry).await?;

        tracing::info!(
            guild_id,
            user_id,
            media = media_type.as_db_str(),
            amount,
            "Log entry added"
        );
        Ok(entry)
    }

    pub async fn history(
        &self,
        guild_id: u64,
        user_id: u64,
        limit: u32,
    ) -> Result<Vec<LogEntry>, LogError> {
        self.store.logs_by_user(guild_id, user_id, Some(limit)).await
    }

    /// Weighted totals over all of a user's entries.
    pub async fn summary(&self, guild_id: u64, user_id: u64) -> Result<LogSummary, LogError> {
        let entries = self.store.logs_by_user(guild_id, user_id, None).await?;

        Ok(LogSummary {
            entry_count: entries.len(),
            total_points: total_points(&entries),
            by_media: points_by_media(&entries),
        })
    }

    /// Returns true when an entry was removed.
    pub async fn undo_latest(&self, guild_id: u64, user_id: u64) -> Result<bool, LogError> {
        let removed = self.store.delete_latest(guild_id, user_id).await?;
        tracing::info!(guild_id, user_id, removed, "Latest log entry deleted");
        Ok(removed > 0)
    }

    /// Returns the number of entries removed.
    pub async fn clear(&self, guild_id: u64, user_id: u64) -> Result<u64, LogError> {
        let removed = self.store.delete_all(guild_id, user_id).await?;
        tracing::info!(guild_id, user_id, removed, "Log entries cleared");
        Ok(removed)
    }

    /// Top 20 plus the rows within one rank of `user_id`.
    pub async fn leaderboard(
        &self,
        guild_id: u64,
        user_id: u64,
        timeframe: Timeframe,
        media_type: Option<MediaType>,
    ) -> Result<Vec<LeaderboardEntry>, LogError> {
        let query = LeaderboardQuery {
            guild_id,
            user_id,
            timeframe,
            media_type,
            top: LEADERBOARD_TOP,
            now: (self.clock)(),
        };
        self.store.leaderboard(&query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingLogStore {
        entries: Mutex<Vec<LogEntry>>,
        queries: Mutex<Vec<LeaderboardQuery>>,
    }

    #[async_trait]
    impl LogStore for RecordingLogStore {
        async fn insert_log(&self, entry: &LogEntry) -> Result<(), LogError> {
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }

        async fn logs_by_user(
            &self,
            guild_id: u64,
            user_id: u64,
            limit: Option<u32>,
        ) -> Result<Vec<LogEntry>, LogError> {
            let entries = self.entries.lock().unwrap();
            Ok(entries
                .iter()
                .rev()
                .filter(|e| e.guild_id == guild_id && e.user_id == user_id)
                .take(limit.map(|l| l as usize).unwrap_or(usize::MAX))
                .cloned()
                .collect())
        }

        async fn delete_latest(&self, guild_id: u64, user_id: u64) -> Result<u64, LogError> {
            let mut entries = self.entries.lock().unwrap();
            match entries
                .iter()
                .rposition(|e| e.guild_id == guild_id && e.user_id == user_id)
            {
                Some(index) => {
                    entries.remove(index);
                    Ok(1)
                }
                None => Ok(0),
            }
        }

        async fn delete_all(&self, guild_id: u64, user_id: u64) -> Result<u64, LogError> {
            let mut entries = self.entries.lock().unwrap();
            let before = entries.len();
            entries.retain(|e| !(e.guild_id == guild_id && e.user_id == user_id));
            Ok((before - entries.len()) as u64)
        }

        async fn leaderboard(
            &self,
            query: &LeaderboardQuery,
        ) -> Result<Vec<LeaderboardEntry>, LogError> {
            self.queries.lock().unwrap().push(query.clone());
            Ok(Vec::new())
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_log_rejects_non_positive_amounts() {
        let service = ReadingLogService::new(RecordingLogStore::default());

        for amount in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            let err = service
                .log(1, 2, MediaType::Manga, amount, None)
                .await
                .unwrap_err();
            assert!(matches!(err, LogError::InvalidAmount(_)));
        }
    }

    #[tokio::test]
    async fn test_log_stamps_clock_and_trims_note() {
        let service = ReadingLogService::new_with_clock(RecordingLogStore::default(), fixed_now);

        let entry = service
            .log(1, 2, MediaType::Anime, 3.0, Some("  Frieren ".to_string()))
            .await
            .unwrap();
        assert_eq!(entry.created_at, fixed_now());
        assert_eq!(entry.note.as_deref(), Some("Frieren"));

        let entry = service
            .log(1, 2, MediaType::Anime, 1.0, Some("   ".to_string()))
            .await
            .unwrap();
        assert!(entry.note.is_none());
    }

    #[tokio::test]
    async fn test_summary_uses_weights() {
        let service = ReadingLogService::new(RecordingLogStore::default());
        service.log(1, 2, MediaType::Manga, 100.0, None).await.unwrap();
        service.log(1, 2, MediaType::Book, 1.0, None).await.unwrap();
        service.log(1, 3, MediaType::Anime, 12.0, None).await.unwrap();

        let summary = service.summary(1, 2).await.unwrap();
        assert_eq!(summary.entry_count, 2);
        assert!((summary.total_points - 21.0).abs() < 1e-9);
        assert_eq!(summary.by_media.len(), 2);
    }

    #[tokio::test]
    async fn test_undo_and_clear() {
        let service = ReadingLogService::new(RecordingLogStore::default());
        service.log(1, 2, MediaType::Manga, 10.0, None).await.unwrap();
        service.log(1, 2, MediaType::Book, 1.0, None).await.unwrap();
        service.log(1, 2, MediaType::Anime, 1.0, None).await.unwrap();

        assert!(service.undo_latest(1, 2).await.unwrap());
        let history = service.history(1, 2, 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].media_type, MediaType::Book);

        assert_eq!(service.clear(1, 2).await.unwrap(), 2);
        assert!(!service.undo_latest(1, 2).await.unwrap());
    }

    #[tokio::test]
    async fn test_leaderboard_query_uses_top_and_clock() {
        let store = RecordingLogStore::default();
        let service = ReadingLogService::new_with_clock(store, fixed_now);

        service
            .leaderboard(1, 2, Timeframe::Week, Some(MediaType::Manga))
            .await
            .unwrap();

        let queries = service.store.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].top, LEADERBOARD_TOP);
        assert_eq!(queries[0].now, fixed_now());
        assert_eq!(queries[0].timeframe, Timeframe::Week);
    }
}
