// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "clubs/mod.rs"]
pub mod clubs;

#[path = "reading_log/mod.rs"]
pub mod reading_log;

#[path = "scoring/mod.rs"]
pub mod scoring;

#[path = "boards/mod.rs"]
pub mod boards;
