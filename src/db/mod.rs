//! Database module for musichub
//!
//! Track cache, listening history, player preferences, favorites and
//! playlists, stored in SQLite through SQLx.

pub(crate) mod engine;
pub mod tables;

pub use engine::{setup_sqlite, DbEngine};
pub use tables::*;
