//! Playlist endpoints: the account's playlists and paged playlist contents.

use crate::{
    error::Result,
    types::{GetUserPlaylistsResponse, Page, PlaylistEntry, PlaylistItemsResponse, UserPlaylist},
};

use super::SpotifyClient;

const PAGE_LIMIT: u32 = 100;
const PLAYLIST_FIELDS: &str = "next,items(track(id,external_ids(isrc)))";

/// Retrieves one page of a playlist's tracks.
///
/// Spotify paginates playlist items with absolute `next` URLs, which are used
/// as the cursor as they are. The ledger drains a playlist by calling this
/// until `next` is `None`.
///
/// # Arguments
///
/// * `client` - Authenticated client; its token is refreshed when stale
/// * `playlist_id` - Spotify playlist id (already validated by the caller)
/// * `cursor` - `next` URL of the previous page, `None` for the first page
///
/// # Returns
///
/// - `Ok(Page<PlaylistEntry>)` - Entries of this page and the next cursor
/// - `Err(Error::AuthExpired)` - The token was rejected
/// - `Err(Error::Upstream)` - Unknown playlist, network failure, or a 502
///   that persisted through the retries
///
/// # Entry Filtering
///
/// - Items without a track (removed or unavailable) are dropped
/// - Local files carry no track id and are dropped
/// - Tracks without an ISRC are kept with `recording_id: None`; the ledger
///   skips them since it keys records by recording
///
/// # API Endpoint
///
/// `GET /playlists/{id}/tracks?fields=next,items(track(id,external_ids(isrc)))&limit=100`
///
/// The `fields` filter keeps the response down to what the ledger needs.
///
/// # Example
///
/// ```
/// let mut cursor = None;
/// loop {
///     let page = playlist_page(&client, "37i9dQZF1DXcBWIGoYBM5M", cursor.as_deref()).await?;
///     println!("{} entries", page.items.len());
///     match page.next {
///         Some(next) => cursor = Some(next),
///         None => break,
///     }
/// }
/// ```
pub async fn playlist_page(
    client: &SpotifyClient,
    playlist_id: &str,
    cursor: Option<&str>,
) -> Result<Page<PlaylistEntry>> {
    let api_url = match cursor {
        Some(next) => next.to_string(),
        None => client.url(&format!(
            "/playlists/{id}/tracks?fields={fields}&limit={limit}",
            id = playlist_id,
            fields = PLAYLIST_FIELDS,
            limit = PAGE_LIMIT
        )),
    };

    let response = client
        .send(|http, token| http.get(&api_url).bearer_auth(token))
        .await?;
    let res = response.json::<PlaylistItemsResponse>().await?;

    let items = res
        .items
        .into_iter()
        .filter_map(|item| item.track)
        .filter_map(|track| {
            let recording_id = track.isrc();
            track.id.map(|track_id| PlaylistEntry {
                recording_id,
                track_id,
            })
        })
        .collect();

    Ok(Page {
        items,
        next: res.next,
    })
}

/// Retrieves all playlists owned or followed by the current account.
///
/// Follows the `next` links of `/me/playlists` until the listing is
/// exhausted, 50 playlists per request. Used by the `playlists` command and
/// the `GET /playlists` route to let the user pick what to track.
///
/// # Arguments
///
/// * `client` - Authenticated client
///
/// # Returns
///
/// - `Ok(Vec<UserPlaylist>)` - Id, name and track count of every playlist,
///   in the order Spotify lists them
/// - `Err(Error::AuthExpired)` / `Err(Error::Upstream)` - as for any request
///
/// # Null Handling
///
/// Spotify occasionally returns `null` entries in the listing; they are
/// skipped. A playlist without a `tracks` object counts as empty.
///
/// # API Endpoint
///
/// `GET /me/playlists?limit=50`
///
/// # Example
///
/// ```
/// for playlist in user_playlists(&client).await? {
///     println!("{} ({} tracks)", playlist.name, playlist.total_tracks);
/// }
/// ```
pub async fn user_playlists(client: &SpotifyClient) -> Result<Vec<UserPlaylist>> {
    let mut api_url = Some(client.url("/me/playlists?limit=50"));
    let mut playlists = Vec::new();

    while let Some(url) = api_url {
        let response = client
            .send(|http, token| http.get(&url).bearer_auth(token))
            .await?;
        let res = response.json::<GetUserPlaylistsResponse>().await?;

        playlists.extend(res.items.into_iter().flatten().map(|p| UserPlaylist {
            id: p.id,
            name: p.name,
            total_tracks: p.tracks.map(|t| t.total).unwrap_or(0),
        }));
        api_url = res.next;
    }

    Ok(playlists)
}
