//! SQLite-backed collaborators for the player
//!
//! The queue and the driver only see the `PreferencesStore` and
//! `HistoryRecorder` traits; these implementations push each write onto
//! the runtime and log failures instead of returning them.

pub mod history_store;
mod preferences_store;

pub use history_store::SqlHistoryRecorder;
pub use preferences_store::SqlPreferencesStore;
