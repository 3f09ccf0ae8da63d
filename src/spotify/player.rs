//! Player endpoints: the recently played feed and the playback queue.

use tracing::debug;

use crate::{
    error::Result,
    types::{PlayedEntry, RecentlyPlayedResponse},
};

use super::SpotifyClient;

/// The maximum Spotify hands out; older plays are simply not available.
const RECENTLY_PLAYED_LIMIT: u32 = 50;

/// Retrieves the recently played feed, most recent first.
///
/// The ledger walks this feed from the newest entry back to the last track it
/// already counted, so the order matters.
///
/// # Arguments
///
/// * `client` - Authenticated client; needs the `user-read-recently-played`
///   scope
///
/// # Returns
///
/// - `Ok(Vec<PlayedEntry>)` - Up to 50 plays, newest first, each with the
///   track's ISRC when Spotify knows it
/// - `Err(Error::AuthExpired)` / `Err(Error::Upstream)` - as for any request
///
/// # Limitations
///
/// Spotify only hands out the last 50 plays. Anything played between two
/// syncs beyond that window is never counted. Plays of local files carry no
/// track id and are left out.
///
/// # API Endpoint
///
/// `GET /me/player/recently-played?limit=50`
///
/// # Example
///
/// ```
/// let feed = recently_played(&client).await?;
/// if let Some(newest) = feed.first() {
///     println!("Last played {} at {}", newest.track_id, newest.played_at);
/// }
/// ```
pub async fn recently_played(client: &SpotifyClient) -> Result<Vec<PlayedEntry>> {
    let api_url = client.url(&format!(
        "/me/player/recently-played?limit={limit}",
        limit = RECENTLY_PLAYED_LIMIT
    ));

    let response = client
        .send(|http, token| http.get(&api_url).bearer_auth(token))
        .await?;
    let res = response.json::<RecentlyPlayedResponse>().await?;

    let mut entries: Vec<PlayedEntry> = res
        .items
        .into_iter()
        .filter_map(|item| {
            let recording_id = item.track.isrc();
            item.track.id.map(|track_id| PlayedEntry {
                recording_id,
                track_id,
                played_at: item.played_at,
            })
        })
        .collect();

    // the endpoint already answers newest first, this only guards the walk
    entries.sort_by(|a, b| b.played_at.cmp(&a.played_at));
    debug!("Fetched {} recently played entries", entries.len());

    Ok(entries)
}

/// Appends `spotify:track:{track_id}` to the playback queue of the active device.
///
/// # Arguments
///
/// * `client` - Authenticated client; needs the `user-modify-playback-state`
///   scope
/// * `track_id` - Spotify track id (not the URI)
///
/// # Returns
///
/// - `Ok(())` - The track was queued
/// - `Err(Error::Upstream)` - No active device (Spotify answers 404), a
///   non-premium account (403), or a network failure
/// - `Err(Error::AuthExpired)` - The token was rejected
///
/// # API Endpoint
///
/// `POST /me/player/queue?uri=spotify:track:{id}` with an empty body; the
/// explicit `Content-Length: 0` keeps Spotify from answering 411.
///
/// # Example
///
/// ```
/// enqueue(&client, "4uLU6hMCjMI75M1A2tKUQC").await?;
/// ```
pub async fn enqueue(client: &SpotifyClient, track_id: &str) -> Result<()> {
    let api_url = client.url("/me/player/queue");
    let uri = format!("spotify:track:{}", track_id);

    client
        .send(|http, token| {
            http.post(&api_url)
                .query(&[("uri", uri.as_str())])
                .header(reqwest::header::CONTENT_LENGTH, 0)
                .bearer_auth(token)
        })
        .await?;

    Ok(())
}
