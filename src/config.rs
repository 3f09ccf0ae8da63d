//! Configuration management for spotishuffler.
//!
//! Values come from environment variables, optionally seeded from a `.env`
//! file in the local data directory:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (where applicable)

use std::{env, path::PathBuf, time::Duration};

use crate::error::{Error, Result};

const APP_DIR: &str = "spotishuffler";
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 3 * 60 * 60;

/// Loads environment variables from `spotishuffler/.env` in the local data directory.
///
/// The directory is created if it doesn't exist, so the token cache and the
/// default database have somewhere to live. A missing `.env` file is not an
/// error, the process environment may already carry everything.
///
/// # Directory Structure
///
/// - Linux: `~/.local/share/spotishuffler/.env`
/// - macOS: `~/Library/Application Support/spotishuffler/.env`
/// - Windows: `%LOCALAPPDATA%/spotishuffler/.env`
///
/// # Errors
///
/// - `Error::Io` - The data directory cannot be created
/// - `Error::Config` - The `.env` file exists but cannot be parsed
///
/// # Example
///
/// ```
/// use spotishuffler::config;
///
/// #[tokio::main]
/// async fn main() {
///     if let Err(e) = config::load_env().await {
///         eprintln!("Configuration error: {}", e);
///     }
/// }
/// ```
pub async fn load_env() -> Result<()> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent).await?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| Error::Config(e.to_string()))?;
    }
    Ok(())
}

/// Platform data directory used for the token cache, the `.env` file and the
/// default database.
///
/// Falls back to `./spotishuffler` when the platform has no local data
/// directory.
///
/// # Example
///
/// ```
/// let token_cache = data_dir().join("cache/token.json");
/// ```
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}

fn required(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("{name} must be set")))
}

/// Returns the address the local HTTP server binds to.
///
/// Reads `SERVER_ADDRESS`. The server handles the OAuth callback and, under
/// `spotishuffler serve`, the JSON routes.
///
/// # Errors
///
/// `Error::Config` if `SERVER_ADDRESS` is not set.
///
/// # Example
///
/// ```
/// let addr = server_addr()?; // e.g. "127.0.0.1:8000"
/// ```
pub fn server_addr() -> Result<String> {
    required("SERVER_ADDRESS")
}

/// Returns the Spotify API client ID for authentication.
///
/// Reads `SPOTIFY_API_AUTH_CLIENT_ID`, the client ID obtained when
/// registering the application on Spotify's developer dashboard. PKCE needs
/// no client secret.
///
/// # Errors
///
/// `Error::Config` if `SPOTIFY_API_AUTH_CLIENT_ID` is not set.
///
/// # Example
///
/// ```
/// let client_id = spotify_client_id()?; // e.g. "abc123..."
/// ```
pub fn spotify_client_id() -> Result<String> {
    required("SPOTIFY_API_AUTH_CLIENT_ID")
}

/// Returns the OAuth redirect URI.
///
/// Reads `SPOTIFY_API_REDIRECT_URI`. It must match one of the redirect URIs
/// registered for the application and point at this server's `/callback`
/// route.
///
/// # Errors
///
/// `Error::Config` if `SPOTIFY_API_REDIRECT_URI` is not set.
///
/// # Example
///
/// ```
/// let redirect_uri = spotify_redirect_uri()?; // e.g. "http://127.0.0.1:8000/callback"
/// ```
pub fn spotify_redirect_uri() -> Result<String> {
    required("SPOTIFY_API_REDIRECT_URI")
}

/// Returns the OAuth scopes to request.
///
/// Reads `SPOTIFY_API_AUTH_SCOPE`, a space separated list.
///
/// # Required Scopes
///
/// - `playlist-read-private` - list and read the tracked playlists
/// - `user-read-recently-played` - the play history feed
/// - `user-modify-playback-state` - append to the playback queue
///
/// # Errors
///
/// `Error::Config` if `SPOTIFY_API_AUTH_SCOPE` is not set.
pub fn spotify_scope() -> Result<String> {
    required("SPOTIFY_API_AUTH_SCOPE")
}

/// Returns the Spotify authorization endpoint.
///
/// Reads `SPOTIFY_API_AUTH_URL`; the user is sent there to grant access.
///
/// # Errors
///
/// `Error::Config` if `SPOTIFY_API_AUTH_URL` is not set.
///
/// # Example
///
/// ```
/// let auth_url = spotify_apiauth_url()?; // "https://accounts.spotify.com/authorize"
/// ```
pub fn spotify_apiauth_url() -> Result<String> {
    required("SPOTIFY_API_AUTH_URL")
}

/// Returns the base URL of the Spotify Web API.
///
/// Reads `SPOTIFY_API_URL`. Every endpoint path is appended to it, so it
/// can point at a local stand-in during development.
///
/// # Errors
///
/// `Error::Config` if `SPOTIFY_API_URL` is not set.
///
/// # Example
///
/// ```
/// let api_url = spotify_apiurl()?; // "https://api.spotify.com/v1"
/// ```
pub fn spotify_apiurl() -> Result<String> {
    required("SPOTIFY_API_URL")
}

/// Returns the Spotify token endpoint.
///
/// Reads `SPOTIFY_API_TOKEN_URL`, used for both the code exchange and token
/// refreshes.
///
/// # Errors
///
/// `Error::Config` if `SPOTIFY_API_TOKEN_URL` is not set.
///
/// # Example
///
/// ```
/// let token_url = spotify_apitoken_url()?; // "https://accounts.spotify.com/api/token"
/// ```
pub fn spotify_apitoken_url() -> Result<String> {
    required("SPOTIFY_API_TOKEN_URL")
}

/// Returns the SQLite connection string of the ledger store.
///
/// Reads `DATABASE_URL`, defaulting to `music.db` in [`data_dir`]. The file
/// is created on first use.
///
/// # Example
///
/// ```
/// let store = SqliteStore::open(&database_url()).await?;
/// ```
pub fn database_url() -> String {
    env::var("DATABASE_URL").unwrap_or_else(|_| {
        format!("sqlite://{}", data_dir().join("music.db").display())
    })
}

/// Returns the period of the background history sync.
///
/// Reads `SYNC_INTERVAL_SECS`, defaulting to three hours. The recently played
/// feed only holds 50 plays, so a shorter period loses fewer plays for heavy
/// listeners.
///
/// # Errors
///
/// `Error::Config` if the value is not a number or is zero.
pub fn sync_interval() -> Result<Duration> {
    match env::var("SYNC_INTERVAL_SECS") {
        Ok(raw) => {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                Error::Config(format!("SYNC_INTERVAL_SECS is not a number: {raw}"))
            })?;
            if secs == 0 {
                return Err(Error::Config("SYNC_INTERVAL_SECS must be positive".into()));
            }
            Ok(Duration::from_secs(secs))
        }
        Err(_) => Ok(Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS)),
    }
}

/// Returns the amount handed to a `by_time` shuffle after each scheduled sync.
///
/// Reads `SCHEDULED_SHUFFLE_AMOUNT`. Unset or empty disables the scheduled
/// shuffle; a `by_time` shuffle queues a third of the amount.
///
/// # Errors
///
/// `Error::Config` if the value is not a non-negative number.
pub fn scheduled_shuffle_amount() -> Result<Option<u32>> {
    match env::var("SCHEDULED_SHUFFLE_AMOUNT") {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| Error::Config(format!("SCHEDULED_SHUFFLE_AMOUNT is not a number: {raw}"))),
        _ => Ok(None),
    }
}
