// Club, book and activity logic.
//
// Like the rest of `core`, nothing in here knows about Discord. Commands hand
// us guild/user ids and codes, we hand back domain values or a `ClubError`
// that the Discord layer turns into a reply.

use super::club_models::{
    normalize_code, Activity, Book, BookActivity, BookDetails, BookReaders, Club, ClubOverview,
    MemberTally, NewBook, ScoreboardScope, UserOverview, DEFAULT_BOOK_POINTS,
};
use crate::core::scoring::{rank_standings, Standing};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ClubError {
    #[error("Unknown club code {0}")]
    UnknownClub(String),

    #[error("Unknown book code {0}.")]
    UnknownBook(String),

    #[error("Existing club already exists under {name}")]
    DuplicateClub { code: String, name: String },

    #[error("Book with code {0} already exists!")]
    DuplicateBook(String),

    #[error("User {user_id} has already finished {book_code}.")]
    AlreadyFinished { user_id: u64, book_code: String },

    #[error("Points must be a finite number, got {0}")]
    InvalidPoints(f64),

    #[error("Storage error: {0}")]
    Storage(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Persistence for clubs, books and activities.
///
/// Lookups return `Ok(None)` when nothing matches; only the service decides
/// whether that is an error.
#[async_trait]
pub trait ClubStore: Send + Sync {
    async fn insert_club(&self, club: &Club) -> Result<(), ClubError>;
    async fn get_club(&self, guild_id: u64, code: &str) -> Result<Option<Club>, ClubError>;

    async fn insert_book(&self, book: &Book) -> Result<(), ClubError>;
    async fn get_book(&self, guild_id: u64, code: &str) -> Result<Option<Book>, ClubError>;

    /// Books of a club, newest first.
    async fn books_by_club(&self, guild_id: u64, club_code: &str)
        -> Result<Vec<Book>, ClubError>;

    /// Delete a book and every activity pointing at it.
    /// Returns the number of books removed (0 or 1).
    async fn delete_book(&self, guild_id: u64, code: &str) -> Result<u64, ClubError>;

    async fn insert_activity(&self, activity: &Activity) -> Result<(), ClubError>;
    async fn get_activity(
        &self,
        guild_id: u64,
        user_id: u64,
        book_code: &str,
    ) -> Result<Option<Activity>, ClubError>;

    /// Activities of a club joined with their books, newest book first.
    async fn activities_by_club(
        &self,
        guild_id: u64,
        club_code: &str,
    ) -> Result<Vec<BookActivity>, ClubError>;

    /// Activities of a user joined with their books, newest book first.
    async fn activities_by_user(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Vec<BookActivity>, ClubError>;

    async fn activities_by_book(
        &self,
        guild_id: u64,
        book_code: &str,
    ) -> Result<Vec<Activity>, ClubError>;

    /// Summed activity points per user, highest first.
    async fn scoreboard(
        &self,
        guild_id: u64,
        scope: &ScoreboardScope,
    ) -> Result<Vec<(u64, f64)>, ClubError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ClubService<S: ClubStore> {
    store: S,
}

impl<S: ClubStore> ClubService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create a club. Rejects a code that is already taken in this guild.
    pub async fn create_club(
        &self,
        guild_id: u64,
        name: &str,
        code: &str,
    ) -> Result<Club, ClubError> {
        let code = normalize_code(code);

        let existing = self.store.get_club(guild_id, &code).await?;
        if let Some(existing) = existing {
            return Err(ClubError::DuplicateClub {
                code,
                name: existing.name,
            });
        }

        let club = Club {
            guild_id,
            code,
            name: name.trim().to_string(),
        };
        self.store.insert_club(&club).await?;

        tracing::info!(guild_id, code = %club.code, "Club created");
        Ok(club)
    }

    pub async fn get_club(&self, guild_id: u64, code: &str) -> Result<Club, ClubError> {
        let code = normalize_code(code);
        let club = self.store.get_club(guild_id, &code).await?;
        club.ok_or(ClubError::UnknownClub(code))
    }

    /// Add a book to an existing club.
    pub async fn add_book(&self, guild_id: u64, new_book: NewBook) -> Result<Book, ClubError> {
        let club_code = normalize_code(&new_book.club_code);
        let code = normalize_code(&new_book.code);
        let points = new_book.points.unwrap_or(DEFAULT_BOOK_POINTS);
        validate_points(points)?;

        let club = self.store.get_club(guild_id, &club_code).await?;
        if club.is_none() {
            return Err(ClubError::UnknownClub(club_code));
        }
        let existing = self.store.get_book(guild_id, &code).await?;
        if existing.is_some() {
            return Err(ClubError::DuplicateBook(code));
        }

        let book = Book {
            guild_id,
            code,
            name: new_book.name.trim().to_string(),
            club_code,
            points,
            created_at: new_book.created_at.unwrap_or_else(today),
        };
        self.store.insert_book(&book).await?;

        tracing::info!(
            guild_id,
            code = %book.code,
            club = %book.club_code,
            points = book.points,
            "Book added"
        );
        Ok(book)
    }

    pub async fn get_book(&self, guild_id: u64, code: &str) -> Result<Book, ClubError> {
        let code = normalize_code(code);
        let book = self.store.get_book(guild_id, &code).await?;
        book.ok_or(ClubError::UnknownBook(code))
    }

    /// Delete a book together with its activities. Returns the deleted book so
    /// the caller knows which club board went stale.
    pub async fn delete_book(&self, guild_id: u64, code: &str) -> Result<Book, ClubError> {
        let book = self.get_book(guild_id, code).await?;
        self.store.delete_book(guild_id, &book.code).await?;

        tracing::info!(guild_id, code = %book.code, "Book deleted");
        Ok(book)
    }

    /// Record that a user finished a book.
    ///
    /// Without explicit points the book's base value is awarded. Explicit
    /// points are stored as given, above or below the base value.
    pub async fn mark_finished(
        &self,
        guild_id: u64,
        user_id: u64,
        book_code: &str,
        points: Option<f64>,
    ) -> Result<(Book, Activity), ClubError> {
        let book = self.get_book(guild_id, book_code).await?;

        let existing = self
            .store
            .get_activity(guild_id, user_id, &book.code)
            .await?;
        if existing.is_some() {
            return Err(ClubError::AlreadyFinished {
                user_id,
                book_code: book.code,
            });
        }

        let points = points.unwrap_or(book.points);
        validate_points(points)?;

        let activity = Activity {
            guild_id,
            book_code: book.code.clone(),
            user_id,
            points,
        };
        self.store.insert_activity(&activity).await?;

        tracing::info!(guild_id, user_id, book = %book.code, points, "Book finished");
        Ok((book, activity))
    }

    /// Every book of a club with its reader count, newest first.
    pub async fn club_overview(
        &self,
        guild_id: u64,
        club_code: &str,
    ) -> Result<ClubOverview, ClubError> {
        let club = self.get_club(guild_id, club_code).await?;
        let books = self.store.books_by_club(guild_id, &club.code).await?;
        let activities = self.store.activities_by_club(guild_id, &club.code).await?;

        let mut readers: HashMap<&str, usize> = HashMap::new();
        for activity in &activities {
            *readers.entry(activity.book_code.as_str()).or_default() += 1;
        }

        let books = books
            .into_iter()
            .map(|book| {
                let reader_count = readers.get(book.code.as_str()).copied().unwrap_or(0);
                BookReaders { book, reader_count }
            })
            .collect();

        Ok(ClubOverview { club, books })
    }

    /// Members of a club with the books they finished, highest total first.
    pub async fn club_members(
        &self,
        guild_id: u64,
        club_code: &str,
    ) -> Result<(Club, Vec<MemberTally>), ClubError> {
        let club = self.get_club(guild_id, club_code).await?;
        let activities = self.store.activities_by_club(guild_id, &club.code).await?;

        let mut tallies: Vec<MemberTally> = Vec::new();
        for activity in activities {
            match tallies.iter_mut().find(|t| t.user_id == activity.user_id) {
                Some(tally) => {
                    tally.total_points += activity.points;
                    tally.books.push((activity.book_code, activity.points));
                }
                None => tallies.push(MemberTally {
                    user_id: activity.user_id,
                    total_points: activity.points,
                    books: vec![(activity.book_code, activity.points)],
                }),
            }
        }

        // Stable sort keeps first-seen order between equal totals.
        tallies.sort_by(|a, b| b.total_points.total_cmp(&a.total_points));
        Ok((club, tallies))
    }

    /// Everything a user finished, grouped by club.
    ///
    /// Returns `Ok(None)` when the user has no activities in this guild.
    pub async fn user_overview(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Option<UserOverview>, ClubError> {
        let activities = self.store.activities_by_user(guild_id, user_id).await?;
        if activities.is_empty() {
            return Ok(None);
        }

        let book_count = activities.len();
        let total_points = activities.iter().map(|a| a.points).sum();

        let mut by_club: Vec<(String, Vec<BookActivity>)> = Vec::new();
        for activity in activities {
            match by_club.iter_mut().find(|(code, _)| *code == activity.club_code) {
                Some((_, list)) => list.push(activity),
                None => by_club.push((activity.club_code.clone(), vec![activity])),
            }
        }

        Ok(Some(UserOverview {
            user_id,
            book_count,
            total_points,
            by_club,
        }))
    }

    pub async fn book_details(&self, guild_id: u64, code: &str) -> Result<BookDetails, ClubError> {
        let book = self.get_book(guild_id, code).await?;
        let readers = self
            .store
            .activities_by_book(guild_id, &book.code)
            .await?
            .into_iter()
            .map(|a| a.user_id)
            .collect();

        Ok(BookDetails { book, readers })
    }

    /// Ranked activity points, either guild-wide (without the VN club) or for
    /// one club. An unknown club code is an error.
    pub async fn scoreboard(
        &self,
        guild_id: u64,
        club_code: Option<&str>,
    ) -> Result<(Option<Club>, Vec<Standing>), ClubError> {
        let club = match club_code {
            Some(code) => Some(self.get_club(guild_id, code).await?),
            None => None,
        };

        let scope = ScoreboardScope::for_club(club.as_ref().map(|c| c.code.as_str()));
        let standings = self.standings(guild_id, &scope).await?;

        Ok((club, standings))
    }

    /// Ranked activity points for a scope, without checking that the club
    /// exists. A club nobody created yet simply has no rows.
    pub async fn standings(
        &self,
        guild_id: u64,
        scope: &ScoreboardScope,
    ) -> Result<Vec<Standing>, ClubError> {
        let rows = self.store.scoreboard(guild_id, scope).await?;
        Ok(rank_standings(rows))
    }

    /// Past picks of a club, newest first, capped at `limit`.
    pub async fn past_picks(
        &self,
        guild_id: u64,
        club_code: &str,
        limit: usize,
    ) -> Result<Vec<Book>, ClubError> {
        let mut books = self
            .store
            .books_by_club(guild_id, &normalize_code(club_code))
            .await?;
        books.truncate(limit);
        Ok(books)
    }
}

fn validate_points(points: f64) -> Result<(), ClubError> {
    if points.is_finite() {
        Ok(())
    } else {
        Err(ClubError::InvalidPoints(points))
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

// ============================================================================
// TESTS
// ============================================================================
