use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub expires_in: u64,
    pub obtained_at: u64,
}

#[derive(Debug, Clone)]
pub struct PkceToken {
    pub code_verifier: String,
    pub token: Option<Token>,
}

/// One authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub average_played: i64,
    pub last_synced_track: Option<String>,
}

/// Ledger row for one recording owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrackRecord {
    pub recording_id: String,
    pub track_id: String,
    pub user_id: String,
    pub played_count: i64,
    pub last_played: Option<DateTime<Utc>>,
}

/// A track found in a playlist. `recording_id` is the ISRC; entries without
/// one cannot be tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub recording_id: Option<String>,
    pub track_id: String,
}

/// One entry of the recently played feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayedEntry {
    pub recording_id: Option<String>,
    pub track_id: String,
    pub played_at: DateTime<Utc>,
}

/// A page of a cursor based listing. `next` is the cursor of the following
/// page, `None` on the last one.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPlaylist {
    pub id: String,
    pub name: String,
    pub total_tracks: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUserResponse {
    pub id: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalIds {
    pub isrc: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackObject {
    pub id: Option<String>,
    pub external_ids: Option<ExternalIds>,
}

impl TrackObject {
    pub fn isrc(&self) -> Option<String> {
        self.external_ids
            .as_ref()
            .and_then(|ids| ids.isrc.clone())
            .filter(|isrc| !isrc.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub track: Option<TrackObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistItemsResponse {
    pub items: Vec<PlaylistItem>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayHistoryItem {
    pub track: TrackObject,
    pub played_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentlyPlayedResponse {
    pub items: Vec<PlayHistoryItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistTracksRef {
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimplifiedPlaylist {
    pub id: String,
    pub name: String,
    pub tracks: Option<PlaylistTracksRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetUserPlaylistsResponse {
    pub items: Vec<Option<SimplifiedPlaylist>>,
    pub next: Option<String>,
}

#[derive(Tabled)]
pub struct PlaylistTableRow {
    pub tracked: String,
    pub name: String,
    pub tracks: u64,
    pub id: String,
}

#[derive(Tabled)]
pub struct HistoryTableRow {
    pub track: String,
    pub played: i64,
    pub last_played: String,
}
