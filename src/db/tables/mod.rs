//! Database table operations

mod favorite_table;
mod history_table;
mod playlist_table;
mod preferences_table;
mod track_table;

pub use favorite_table::FavoriteTable;
pub use history_table::{HistoryPage, HistoryTable};
pub use playlist_table::PlaylistTable;
pub use preferences_table::PreferencesTable;
pub use track_table::TrackTable;
