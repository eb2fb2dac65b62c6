use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Club whose picks are tallied on their own board and left out of the
/// guild-wide rollup.
pub const VN_CLUB_CODE: &str = "VN";

/// Base value of a new book when the admin doesn't pass one.
pub const DEFAULT_BOOK_POINTS: f64 = 2.0;

/// A reading group, identified by a short code unique within its guild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Club {
    pub guild_id: u64,
    pub code: String,
    pub name: String,
}

/// A pick belonging to one club.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub guild_id: u64,
    pub code: String,
    pub name: String,
    pub club_code: String,
    pub points: f64,
    pub created_at: NaiveDate,
}

/// A user's completion record for one book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub guild_id: u64,
    pub book_code: String,
    pub user_id: u64,
    pub points: f64,
}

/// An activity joined with the book it refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct BookActivity {
    pub user_id: u64,
    pub book_code: String,
    pub book_name: String,
    pub club_code: String,
    pub points: f64,
    pub book_points: f64,
    pub book_created_at: NaiveDate,
}

impl BookActivity {
    pub fn credit(&self) -> Credit {
        if self.points < self.book_points {
            Credit::Partial
        } else if self.points > self.book_points {
            Credit::Extra
        } else {
            Credit::Full
        }
    }
}

/// How the awarded points compare to the book's base value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credit {
    Full,
    Partial,
    Extra,
}

/// Input for adding a book. Optional fields fall back to defaults.
#[derive(Debug, Clone)]
pub struct NewBook {
    pub club_code: String,
    pub name: String,
    pub code: String,
    pub points: Option<f64>,
    pub created_at: Option<NaiveDate>,
}

/// Which activities a scoreboard sums.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreboardScope {
    /// Every club in the guild except the one named here.
    Rollup { excluded_club: String },
    /// A single club.
    Club(String),
}

impl ScoreboardScope {
    pub fn for_club(club_code: Option<&str>) -> Self {
        match club_code {
            Some(code) => ScoreboardScope::Club(normalize_code(code)),
            None => ScoreboardScope::Rollup {
                excluded_club: VN_CLUB_CODE.to_string(),
            },
        }
    }

    /// Whether an activity in `club_code` counts towards this scope.
    pub fn includes(&self, club_code: &str) -> bool {
        match self {
            ScoreboardScope::Rollup { excluded_club } => club_code != excluded_club,
            ScoreboardScope::Club(code) => club_code == code,
        }
    }
}

/// A book in a club overview together with how many members finished it.
#[derive(Debug, Clone)]
pub struct BookReaders {
    pub book: Book,
    pub reader_count: usize,
}

#[derive(Debug, Clone)]
pub struct ClubOverview {
    pub club: Club,
    pub books: Vec<BookReaders>,
}

/// One member of a club and what they read there.
#[derive(Debug, Clone)]
pub struct MemberTally {
    pub user_id: u64,
    pub books: Vec<(String, f64)>,
    pub total_points: f64,
}

#[derive(Debug, Clone)]
pub struct UserOverview {
    pub user_id: u64,
    pub book_count: usize,
    pub total_points: f64,
    /// Activities grouped by club code, in the order the clubs first appear.
    pub by_club: Vec<(String, Vec<BookActivity>)>,
}

#[derive(Debug, Clone)]
pub struct BookDetails {
    pub book: Book,
    pub readers: Vec<u64>,
}

/// Codes are compared upper-case everywhere.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
