// SQLite implementation of the ClubStore trait
//
// Tables:
// - clubs: one row per club code and guild
// - books: club picks with their base point value
// - activities: who finished which book, with the points awarded

use crate::core::clubs::{
    Activity, Book, BookActivity, Club, ClubError, ClubStore, ScoreboardScope,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteClubStore {
    pool: Pool<Sqlite>,
}

impl SqliteClubStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS clubs (
                guild_id INTEGER NOT NULL,
                code TEXT NOT NULL,
                name TEXT NOT NULL,
                PRIMARY KEY (guild_id, code)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS books (
                guild_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                code TEXT NOT NULL,
                club_code TEXT NOT NULL,
                points REAL NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (guild_id, code)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS activities (
                guild_id INTEGER NOT NULL,
                book_code TEXT NOT NULL,
                user_id INTEGER NOT NULL,
                points REAL NOT NULL,
                PRIMARY KEY (guild_id, book_code, user_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ClubStore for SqliteClubStore {
    async fn insert_club(&self, club: &Club) -> Result<(), ClubError> {
        sqlx::query("INSERT INTO clubs (guild_id, code, name) VALUES (?, ?, ?)")
            .bind(club.guild_id as i64)
            .bind(&club.code)
            .bind(&club.name)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn get_club(&self, guild_id: u64, code: &str) -> Result<Option<Club>, ClubError> {
        let row = sqlx::query("SELECT guild_id, code, name FROM clubs WHERE guild_id = ? AND code = ?")
            .bind(guild_id as i64)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(row.map(|row| Club {
            guild_id: row.get::<i64, _>("guild_id") as u64,
            code: row.get("code"),
            name: row.get("name"),
        }))
    }

    async fn insert_book(&self, book: &Book) -> Result<(), ClubError> {
        sqlx::query(
            r#"
            INSERT INTO books (guild_id, name, code, club_code, points, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(book.guild_id as i64)
        .bind(&book.name)
        .bind(&book.code)
        .bind(&book.club_code)
        .bind(book.points)
        .bind(book.created_at.format(DATE_FORMAT).to_string())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn get_book(&self, guild_id: u64, code: &str) -> Result<Option<Book>, ClubError> {
        let row = sqlx::query("SELECT * FROM books WHERE guild_id = ? AND code = ?")
            .bind(guild_id as i64)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        row.map(|row| row_to_book(&row)).transpose()
    }

    async fn books_by_club(
        &self,
        guild_id: u64,
        club_code: &str,
    ) -> Result<Vec<Book>, ClubError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM books
            WHERE guild_id = ? AND club_code = ?
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(guild_id as i64)
        .bind(club_code)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter().map(row_to_book).collect()
    }

    async fn delete_book(&self, guild_id: u64, code: &str) -> Result<u64, ClubError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let deleted = sqlx::query("DELETE FROM books WHERE guild_id = ? AND code = ?")
            .bind(guild_id as i64)
            .bind(code)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?
            .rows_affected();

        sqlx::query("DELETE FROM activities WHERE guild_id = ? AND book_code = ?")
            .bind(guild_id as i64)
            .bind(code)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;
        Ok(deleted)
    }

    async fn insert_activity(&self, activity: &Activity) -> Result<(), ClubError> {
        sqlx::query(
            r#"
            INSERT INTO activities (guild_id, book_code, user_id, points)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(activity.guild_id as i64)
        .bind(&activity.book_code)
        .bind(activity.user_id as i64)
        .bind(activity.points)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn get_activity(
        &self,
        guild_id: u64,
        user_id: u64,
        book_code: &str,
    ) -> Result<Option<Activity>, ClubError> {
        let row = sqlx::query(
            r#"
            SELECT guild_id, book_code, user_id, points FROM activities
            WHERE guild_id = ? AND user_id = ? AND book_code = ?
            "#,
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .bind(book_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(row.map(|row| row_to_activity(&row)))
    }

    async fn activities_by_club(
        &self,
        guild_id: u64,
        club_code: &str,
    ) -> Result<Vec<BookActivity>, ClubError> {
        let rows = sqlx::query(
            r#"
            SELECT a.user_id, a.book_code, a.points,
                   b.name AS book_name, b.club_code, b.points AS book_points,
                   b.created_at AS book_created_at
            FROM activities a
            JOIN books b ON b.guild_id = a.guild_id AND b.code = a.book_code
            WHERE a.guild_id = ? AND b.club_code = ?
            ORDER BY b.created_at DESC, a.rowid
            "#,
        )
        .bind(guild_id as i64)
        .bind(club_code)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter().map(row_to_book_activity).collect()
    }

    async fn activities_by_user(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Vec<BookActivity>, ClubError> {
        let rows = sqlx::query(
            r#"
            SELECT a.user_id, a.book_code, a.points,
                   b.name AS book_name, b.club_code, b.points AS book_points,
                   b.created_at AS book_created_at
            FROM activities a
            JOIN books b ON b.guild_id = a.guild_id AND b.code = a.book_code
            WHERE a.guild_id = ? AND a.user_id = ?
            ORDER BY b.created_at DESC, a.rowid
            "#,
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter().map(row_to_book_activity).collect()
    }

    async fn activities_by_book(
        &self,
        guild_id: u64,
        book_code: &str,
    ) -> Result<Vec<Activity>, ClubError> {
        let rows = sqlx::query(
            r#"
            SELECT guild_id, book_code, user_id, points FROM activities
            WHERE guild_id = ? AND book_code = ?
            ORDER BY rowid
            "#,
        )
        .bind(guild_id as i64)
        .bind(book_code)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(rows.iter().map(row_to_activity).collect())
    }

    async fn scoreboard(
        &self,
        guild_id: u64,
        scope: &ScoreboardScope,
    ) -> Result<Vec<(u64, f64)>, ClubError> {
        let (club_filter, club_code) = match scope {
            ScoreboardScope::Rollup { excluded_club } => ("b.club_code != ?", excluded_club),
            ScoreboardScope::Club(code) => ("b.club_code = ?", code),
        };

        let sql = format!(
            r#"
            SELECT a.user_id, SUM(a.points) AS points
            FROM activities a
            JOIN books b ON b.guild_id = a.guild_id AND b.code = a.book_code
            WHERE a.guild_id = ? AND {club_filter}
            GROUP BY a.user_id
            ORDER BY points DESC, a.user_id
            "#
        );

        let rows = sqlx::query(&sql)
            .bind(guild_id as i64)
            .bind(club_code)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(rows
            .iter()
            .map(|row| {
                (
                    row.get::<i64, _>("user_id") as u64,
                    row.get::<f64, _>("points"),
                )
            })
            .collect())
    }
}

fn storage_error(err: sqlx::Error) -> ClubError {
    ClubError::Storage(err.to_string())
}

fn parse_date(value: &str) -> Result<NaiveDate, ClubError> {
    // Older rows may carry a time part after the date.
    let date = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map_err(|e| ClubError::Storage(format!("bad date '{}': {}", value, e)))
}

fn row_to_book(row: &SqliteRow) -> Result<Book, ClubError> {
    let created_at: String = row.get("created_at");

    Ok(Book {
        guild_id: row.get::<i64, _>("guild_id") as u64,
        code: row.get("code"),
        name: row.get("name"),
        club_code: row.get("club_code"),
        points: row.get("points"),
        created_at: parse_date(&created_at)?,
    })
}

fn row_to_activity(row: &SqliteRow) -> Activity {
    Activity {
        guild_id: row.get::<i64, _>("guild_id") as u64,
        book_code: row.get("book_code"),
        user_id: row.get::<i64, _>("user_id") as u64,
        points: row.get("points"),
    }
}

fn row_to_book_activity(row: &SqliteRow) -> Result<BookActivity, ClubError> {
    let created_at: String = row.get("book_created_at");

    Ok(BookActivity {
        user_id: row.get::<i64, _>("user_id") as u64,
        book_code: row.get("book_code"),
        book_name: row.get("book_name"),
        club_code: row.get("club_code"),
        points: row.get("points"),
        book_points: row.get("book_points"),
        book_created_at: parse_date(&created_at)?,
    })
}
