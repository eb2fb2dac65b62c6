// SQLite implementation of the LogStore trait.
//
// Timestamps are stored as fixed-width RFC 3339 text in UTC so that string
// order is chronological and SQLite's date functions can read them.

use crate::core::reading_log::{
    LeaderboardEntry, LeaderboardQuery, LogEntry, LogError, LogStore, MediaType, Timeframe,
};
use crate::core::scoring::weighted_points_sql;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteReadingLogStore {
    pool: Pool<Sqlite>,
}

impl SqliteReadingLogStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS logs (
                guild_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                media_type TEXT NOT NULL,
                amount REAL NOT NULL,
                note TEXT,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_logs_guild_created ON logs (guild_id, created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn storage_error(err: sqlx::Error) -> LogError {
    LogError::Storage(err.to_string())
}

fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_to_entry(row: &SqliteRow) -> Result<LogEntry, LogError> {
    let media: String = row.get("media_type");
    let media_type =
        MediaType::from_db_str(&media).ok_or_else(|| LogError::UnknownMediaType(media.clone()))?;

    let created_at: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| LogError::Storage(format!("bad timestamp '{}': {}", created_at, e)))?
        .with_timezone(&Utc);

    Ok(LogEntry {
        guild_id: row.get::<i64, _>("guild_id") as u64,
        user_id: row.get::<i64, _>("user_id") as u64,
        media_type,
        amount: row.get("amount"),
        note: row.get("note"),
        created_at,
    })
}

#[async_trait]
impl LogStore for SqliteReadingLogStore {
    async fn insert_log(&self, entry: &LogEntry) -> Result<(), LogError> {
        sqlx::query(
            r#"
            INSERT INTO logs (guild_id, user_id, media_type, amount, note, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.guild_id as i64)
        .bind(entry.user_id as i64)
        .bind(entry.media_type.as_db_str())
        .bind(entry.amount)
        .bind(entry.note.as_deref())
        .bind(timestamp(&entry.created_at))
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn logs_by_user(
        &self,
        guild_id: u64,
        user_id: u64,
        limit: Option<u32>,
    ) -> Result<Vec<LogEntry>, LogError> {
        // A negative LIMIT means no limit in SQLite.
        let limit = limit.map(i64::from).unwrap_or(-1);

        let rows = sqlx::query(
            r#"
            SELECT * FROM logs
            WHERE guild_id = ? AND user_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn delete_latest(&self, guild_id: u64, user_id: u64) -> Result<u64, LogError> {
        let result = sqlx::query(
            r#"
            DELETE FROM logs WHERE rowid = (
                SELECT rowid FROM logs
                WHERE guild_id = ? AND user_id = ?
                ORDER BY created_at DESC, rowid DESC
                LIMIT 1
            )
            "#,
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(result.rows_affected())
    }

    async fn delete_all(&self, guild_id: u64, user_id: u64) -> Result<u64, LogError> {
        let result = sqlx::query("DELETE FROM logs WHERE guild_id = ? AND user_id = ?")
            .bind(guild_id as i64)
            .bind(user_id as i64)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(result.rows_affected())
    }

    async fn leaderboard(
        &self,
        query: &LeaderboardQuery,
    ) -> Result<Vec<LeaderboardEntry>, LogError> {
        let time_filter = match query.timeframe {
            Timeframe::AllTime => "",
            Timeframe::Month => "AND created_at >= date(?, 'start of month')",
            // Same weekday as today, regardless of which week.
            Timeframe::Week => "AND strftime('%w', created_at) = strftime('%w', ?)",
        };
        let media_filter = if query.media_type.is_some() {
            "AND media_type = ?"
        } else {
            ""
        };

        let sql = format!(
            r#"
            WITH totals AS (
                SELECT user_id, CAST(SUM({weights}) AS REAL) AS total
                FROM logs
                WHERE guild_id = ? {time_filter} {media_filter}
                GROUP BY user_id
            ),
            ranked AS (
                SELECT user_id, total, RANK() OVER (ORDER BY total DESC) AS user_rank
                FROM totals
            )
            SELECT user_id, total, user_rank FROM ranked
            WHERE user_rank <= ?
               OR user_rank BETWEEN (SELECT user_rank FROM ranked WHERE user_id = ?) - 1
                                AND (SELECT user_rank FROM ranked WHERE user_id = ?) + 1
            ORDER BY user_rank, user_id
            "#,
            weights = weighted_points_sql(),
        );

        let mut statement = sqlx::query(&sql).bind(query.guild_id as i64);
        if query.timeframe != Timeframe::AllTime {
            statement = statement.bind(timestamp(&query.now));
        }
        if let Some(media) = query.media_type {
            statement = statement.bind(media.as_db_str());
        }
        let rows = statement
            .bind(i64::from(query.top))
            .bind(query.user_id as i64)
            .bind(query.user_id as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        rows.iter()
            .map(|row| {
                Ok(LeaderboardEntry {
                    user_id: row.try_get::<i64, _>("user_id").map_err(storage_error)? as u64,
                    total: row.try_get("total").map_err(storage_error)?,
                    rank: row.try_get::<i64, _>("user_rank").map_err(storage_error)? as u32,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reading_log::ReadingLogService;
    use crate::core::scoring::total_points;
    use crate::infra::database::temp_pool;
    use chrono::TimeZone;

    const GUILD: u64 = 1;

    async fn store(dir: &tempfile::TempDir) -> SqliteReadingLogStore {
        let store = SqliteReadingLogStore::new(temp_pool(dir).await);
        store.migrate().await.unwrap();
        store
    }

    fn at(day: u32, month: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, month, day, 9, 0, 0).unwrap()
    }

    fn entry(user_id: u64, media_type: MediaType, amount: f64, created_at: DateTime<Utc>) -> LogEntry {
        LogEntry {
            guild_id: GUILD,
            user_id,
            media_type,
            amount,
            note: None,
            created_at,
        }
    }

    fn query(user_id: u64, timeframe: Timeframe, media_type: Option<MediaType>) -> LeaderboardQuery {
        LeaderboardQuery {
            guild_id: GUILD,
            user_id,
            timeframe,
            media_type,
            top: 20,
            // Monday 19 October 2026
            now: Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_entries_round_trip_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;

        let mut first = entry(5, MediaType::Manga, 30.0, at(1, 10));
        first.note = Some("Yotsuba".to_string());
        store.insert_log(&first).await.unwrap();
        store
            .insert_log(&entry(5, MediaType::Anime, 2.0, at(3, 10)))
            .await
            .unwrap();
        store
            .insert_log(&entry(6, MediaType::Book, 1.0, at(2, 10)))
            .await
            .unwrap();

        let logs = store.logs_by_user(GUILD, 5, None).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].media_type, MediaType::Anime);
        assert_eq!(logs[1], first);

        let limited = store.logs_by_user(GUILD, 5, Some(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert!(store.logs_by_user(GUILD + 1, 5, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_undo_removes_only_the_latest_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;

        store
            .insert_log(&entry(5, MediaType::Manga, 10.0, at(5, 10)))
            .await
            .unwrap();
        store
            .insert_log(&entry(5, MediaType::Manga, 20.0, at(5, 10)))
            .await
            .unwrap();
        store
            .insert_log(&entry(5, MediaType::Book, 1.0, at(1, 10)))
            .await
            .unwrap();

        assert_eq!(store.delete_latest(GUILD, 5).await.unwrap(), 1);
        let amounts: Vec<f64> = store
            .logs_by_user(GUILD, 5, None)
            .await
            .unwrap()
            .iter()
            .map(|e| e.amount)
            .collect();
        assert_eq!(amounts, vec![10.0, 1.0]);

        assert_eq!(store.delete_all(GUILD, 5).await.unwrap(), 2);
        assert_eq!(store.delete_latest(GUILD, 5).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_stored_media_type_fails_loudly() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;

        sqlx::query(
            "INSERT INTO logs (guild_id, user_id, media_type, amount, created_at) VALUES (?, ?, 'PODCAST', 3, ?)",
        )
        .bind(GUILD as i64)
        .bind(5_i64)
        .bind(timestamp(&at(1, 10)))
        .execute(&store.pool)
        .await
        .unwrap();

        let err = store.logs_by_user(GUILD, 5, None).await.unwrap_err();
        assert!(matches!(err, LogError::UnknownMediaType(ref m) if m == "PODCAST"));
    }

    #[tokio::test]
    async fn test_unknown_media_type_scores_zero_on_leaderboard() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;

        sqlx::query(
            "INSERT INTO logs (guild_id, user_id, media_type, amount, created_at) VALUES (?, ?, 'PODCAST', 3, ?)",
        )
        .bind(GUILD as i64)
        .bind(5_i64)
        .bind(timestamp(&at(1, 10)))
        .execute(&store.pool)
        .await
        .unwrap();

        let board = store.leaderboard(&query(5, Timeframe::AllTime, None)).await.unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].user_id, 5);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].total, 0.0);
    }

    #[tokio::test]
    async fn test_missing_table_surfaces_as_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteReadingLogStore::new(temp_pool(&dir).await);

        let err = store.logs_by_user(GUILD, 5, None).await.unwrap_err();
        assert!(matches!(err, LogError::Storage(ref m) if m.contains("no such table")));
        assert!(matches!(
            store.leaderboard(&query(5, Timeframe::AllTime, None)).await,
            Err(LogError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_leaderboard_weights_and_ties() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;

        // 100 manga pages + 1 book = 21 points
        store.insert_log(&entry(1, MediaType::Manga, 100.0, at(1, 10))).await.unwrap();
        store.insert_log(&entry(1, MediaType::Book, 1.0, at(2, 10))).await.unwrap();
        store.insert_log(&entry(2, MediaType::Book, 21.0, at(2, 10))).await.unwrap();
        store.insert_log(&entry(3, MediaType::Anime, 1.0, at(3, 10))).await.unwrap();

        let board = store.leaderboard(&query(1, Timeframe::AllTime, None)).await.unwrap();
        let ranks: Vec<(u64, u32)> = board.iter().map(|e| (e.user_id, e.rank)).collect();
        assert_eq!(ranks, vec![(1, 1), (2, 1), (3, 3)]);
        assert!((board[0].total - 21.0).abs() < 1e-9);
        assert!((board[2].total - 9.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_leaderboard_includes_neighbourhood_of_requester() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;

        // Users 1..=30 with distinct totals; user n logs n books.
        for user in 1..=30_u64 {
            store
                .insert_log(&entry(user, MediaType::Book, user as f64, at(1, 10)))
                .await
                .unwrap();
        }

        // User 5 is ranked 26th.
        let board = store.leaderboard(&query(5, Timeframe::AllTime, None)).await.unwrap();
        let ranks: Vec<u32> = board.iter().map(|e| e.rank).collect();
        let mut expected: Vec<u32> = (1..=20).collect();
        expected.extend([25, 26, 27]);
        assert_eq!(ranks, expected);
        assert_eq!(board[21].user_id, 5);

        // Someone inside the top 20 sees just the top 20 (plus their neighbour).
        let board = store.leaderboard(&query(30, Timeframe::AllTime, None)).await.unwrap();
        assert_eq!(board.len(), 20);

        // A requester with no entries sees the top 20.
        let board = store.leaderboard(&query(999, Timeframe::AllTime, None)).await.unwrap();
        assert_eq!(board.len(), 20);
    }

    #[tokio::test]
    async fn test_leaderboard_month_and_weekday_windows() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;

        // 12 Oct 2026 is a Monday like "now", 18 Oct is a Sunday.
        store.insert_log(&entry(1, MediaType::Book, 1.0, at(30, 9))).await.unwrap();
        store.insert_log(&entry(2, MediaType::Book, 2.0, at(12, 10))).await.unwrap();
        store.insert_log(&entry(3, MediaType::Book, 3.0, at(18, 10))).await.unwrap();
        // 28 Sep 2026 is also a Monday.
        store.insert_log(&entry(4, MediaType::Book, 4.0, at(28, 9))).await.unwrap();

        let month = store.leaderboard(&query(1, Timeframe::Month, None)).await.unwrap();
        let users: Vec<u64> = month.iter().map(|e| e.user_id).collect();
        assert_eq!(users, vec![3, 2]);

        let week = store.leaderboard(&query(1, Timeframe::Week, None)).await.unwrap();
        let users: Vec<u64> = week.iter().map(|e| e.user_id).collect();
        assert_eq!(users, vec![4, 2]);
    }

    #[tokio::test]
    async fn test_leaderboard_media_filter_and_guild_partition() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;

        store.insert_log(&entry(1, MediaType::Anime, 10.0, at(1, 10))).await.unwrap();
        store.insert_log(&entry(2, MediaType::Manga, 5.0, at(1, 10))).await.unwrap();
        let mut elsewhere = entry(3, MediaType::Manga, 500.0, at(1, 10));
        elsewhere.guild_id = GUILD + 1;
        store.insert_log(&elsewhere).await.unwrap();

        let board = store
            .leaderboard(&query(1, Timeframe::AllTime, Some(MediaType::Manga)))
            .await
            .unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].user_id, 2);
        assert!((board[0].total - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_sql_totals_match_scoring_engine() {
        let dir = tempfile::tempdir().unwrap();
        let service = ReadingLogService::new(store(&dir).await);

        let mut amounts = 1.0;
        for media in MediaType::ALL {
            service.log(GUILD, 8, media, amounts * 37.0, None).await.unwrap();
            amounts += 1.0;
        }

        let summary = service.summary(GUILD, 8).await.unwrap();
        let history = service.history(GUILD, 8, 100).await.unwrap();
        assert_eq!(history.len(), MediaType::ALL.len());
        assert!((summary.total_points - total_points(&history)).abs() < 1e-9);

        let board = service
            .leaderboard(GUILD, 8, Timeframe::AllTime, None)
            .await
            .unwrap();
        assert_eq!(board.len(), 1);
        assert!((board[0].total - summary.total_points).abs() < 1e-6);
    }
}
