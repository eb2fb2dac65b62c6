// Discord layer - commands and the board updater.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "boards/board_updater.rs"]
pub mod boards;

// Re-export command types for convenience
pub use commands::{Data, Error};
