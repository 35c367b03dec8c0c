//! Data models for the hub
//!
//! Provider-independent shapes shared by the adapters, the player and the API.

mod enums;
mod favorite;
mod history;
mod playable;
mod playlist;
mod preferences;
mod station;
mod track;

pub use enums::{QueuePosition, RepeatMode, Source};
pub use favorite::FavoriteEntry;
pub use history::{HistoryAggregate, HistoryEntry, HistoryRange};
pub use playable::Playable;
pub use playlist::{
    Playlist, PlaylistChanges, PlaylistPosition, PlaylistTrack, MAX_PLAYLIST_DESCRIPTION_LEN,
    MAX_PLAYLIST_NAME_LEN,
};
pub use preferences::PlayerPreferences;
pub use station::{decode_station_id, default_stations, encode_station_id, RadioStation};
pub use track::{Track, TrackKey};
