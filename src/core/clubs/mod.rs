// Clubs module - reading clubs, their book picks and who finished what.

mod club_models;
mod club_service;

pub use club_models::{
    normalize_code, Activity, Book, BookActivity, Club, Credit, NewBook, ScoreboardScope,
};
pub use club_service::{ClubError, ClubService, ClubStore};
