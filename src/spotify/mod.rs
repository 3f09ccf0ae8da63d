//! # Spotify Integration Module
//!
//! Everything spotishuffler needs from the Spotify Web API:
//!
//! ```text
//! Ledger / Selector / Service layer
//!          ↓
//!    MusicService (trait)
//!          ↓
//!    SpotifyClient ── TokenManager (PKCE token cache, refresh)
//!          ↓
//! HTTP Layer (reqwest, JSON)
//! ```
//!
//! - [`auth`] - OAuth 2.0 PKCE: authorization URL, code exchange, refresh.
//! - [`playlists`] - the account's playlists and playlist contents (paged).
//! - [`player`] - the recently played feed and the playback queue.
//! - [`user`] - the current account's profile.
//!
//! The ledger and the selector only ever see the [`MusicService`] trait, so
//! they receive their client explicitly instead of reaching for a global one.
//!
//! ## API Coverage
//!
//! - `GET /me` - current account
//! - `GET /me/playlists` - playlists for the selection screen
//! - `GET /playlists/{id}/tracks` - playlist members with their ISRC
//! - `GET /me/player/recently-played` - last 50 plays
//! - `POST /me/player/queue` - append a track to the queue
//! - `POST /api/token` - token exchange and refresh

pub mod auth;
pub mod player;
pub mod playlists;
pub mod user;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tokio::{sync::Mutex, time::sleep};
use tracing::debug;

use crate::{
    error::{Error, Result},
    management::TokenManager,
    types::{CurrentUserResponse, Page, PlayedEntry, PlaylistEntry, UserPlaylist},
};

/// How often a request answered with 502 Bad Gateway is sent again.
const BAD_GATEWAY_ATTEMPTS: u32 = 3;

/// The catalog operations the ledger and the selector depend on.
#[async_trait]
pub trait MusicService: Send + Sync {
    /// One page of a playlist's members. `cursor` is the `next` of the previous
    /// page, `None` for the first one.
    async fn playlist_page(
        &self,
        playlist_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<PlaylistEntry>>;

    /// Recently played tracks, most recent first.
    async fn recently_played(&self) -> Result<Vec<PlayedEntry>>;

    /// Appends a track to the active device's playback queue.
    async fn enqueue(&self, track_id: &str) -> Result<()>;
}

/// [`MusicService`] backed by the Spotify Web API.
pub struct SpotifyClient {
    http: Client,
    api_url: String,
    tokens: Mutex<TokenManager>,
}

impl SpotifyClient {
    pub fn new(api_url: String, tokens: TokenManager) -> Self {
        Self {
            http: Client::new(),
            api_url,
            tokens: Mutex::new(tokens),
        }
    }

    /// Client using the configured API URL and the cached token.
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)` - `SPOTIFY_API_URL` is not set
    /// - `Err(Error::AuthExpired)` - No cached token; run `spotishuffler auth`
    pub async fn from_cache() -> Result<Self> {
        let api_url = crate::config::spotify_apiurl()?;
        let tokens = TokenManager::load().await?;
        Ok(Self::new(api_url, tokens))
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), path)
    }

    pub(crate) async fn bearer(&self) -> Result<String> {
        self.tokens.lock().await.get_valid_token().await
    }

    /// Sends the request built by `build` with a valid bearer token.
    ///
    /// `build` is called once per attempt with the HTTP client and the access
    /// token, so a token refreshed between attempts is picked up.
    ///
    /// # Status Handling
    ///
    /// - `502 Bad Gateway` - Retried after 10 seconds, at most
    ///   `BAD_GATEWAY_ATTEMPTS` attempts in total
    /// - `401 Unauthorized` - [`Error::AuthExpired`]
    /// - Any other non-success status - [`Error::Upstream`] with the status and
    ///   the response body
    ///
    /// # Example
    ///
    /// ```
    /// let url = client.url("/me");
    /// let response = client.send(|http, token| http.get(&url).bearer_auth(token)).await?;
    /// ```
    pub(crate) async fn send<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&Client, &str) -> RequestBuilder + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let token = self.bearer().await?;
            let response = build(&self.http, &token).send().await?;

            match response.status() {
                StatusCode::BAD_GATEWAY if attempt < BAD_GATEWAY_ATTEMPTS => {
                    debug!("Spotify answered 502, retrying (attempt {})", attempt);
                    sleep(Duration::from_secs(10)).await;
                    continue; // retry
                }
                StatusCode::UNAUTHORIZED => return Err(Error::AuthExpired),
                status if !status.is_success() => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::Upstream(format!("{status}: {body}")));
                }
                _ => return Ok(response),
            }
        }
    }

    pub async fn current_user(&self) -> Result<CurrentUserResponse> {
        user::current_user(self).await
    }

    pub async fn user_playlists(&self) -> Result<Vec<UserPlaylist>> {
        playlists::user_playlists(self).await
    }
}

#[async_trait]
impl MusicService for SpotifyClient {
    async fn playlist_page(
        &self,
        playlist_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<PlaylistEntry>> {
        playlists::playlist_page(self, playlist_id, cursor).await
    }

    async fn recently_played(&self) -> Result<Vec<PlayedEntry>> {
        player::recently_played(self).await
    }

    async fn enqueue(&self, track_id: &str) -> Result<()> {
        player::enqueue(self, track_id).await
    }
}
