// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "database.rs"]
pub mod database;

#[path = "clubs/sqlite_club_store.rs"]
pub mod clubs;

#[path = "reading_log/sqlite_log_store.rs"]
pub mod reading_log;
