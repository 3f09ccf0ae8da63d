//! OAuth 2.0 PKCE authorization against the Spotify accounts service.
//!
//! Covers the whole credential lifecycle: building the authorization URL,
//! exchanging the callback code, refreshing expired tokens and the
//! interactive command-line login that ties them together.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    config,
    error::{Error, Result},
    server::{AppState, start_api_server},
    types::{PkceToken, Token},
    utils, warning,
};

/// Runs the complete OAuth 2.0 PKCE flow from the command line.
///
/// The PKCE (Proof Key for Code Exchange) flow lets a public client such as a
/// CLI obtain tokens without shipping a client secret.
///
/// # Arguments
///
/// * `state` - Shared server state. Its PKCE slot carries the code verifier to
///   the callback handler and the resulting token back to this function; its
///   store is where the callback registers the account.
///
/// # Authentication Flow
///
/// 1. **PKCE Setup**: Generates a code verifier and derives the S256 challenge
/// 2. **Verifier Hand-off**: Stores the verifier in the shared state
/// 3. **Server Start**: Spawns the local HTTP server that serves `/callback`
/// 4. **Browser Launch**: Opens the Spotify authorization URL
/// 5. **Callback Handling**: The server exchanges the code, caches the token
///    and registers the user in the ledger store
/// 6. **Hand-back**: Waits up to 60 seconds for the token to show up in the
///    shared state, then stops the server
///
/// # Returns
///
/// - `Ok(Token)` - The token obtained by the callback (already persisted)
/// - `Err(Error::Config)` - A required `SPOTIFY_*` variable is missing
/// - `Err(Error::AuthExpired)` - No callback arrived within the time limit
///
/// # Error Handling
///
/// A browser that cannot be opened only produces a warning with the URL to
/// open manually; the flow keeps waiting for the callback.
///
/// # Example
///
/// ```
/// let store = Arc::new(SqliteStore::open(&config::database_url()).await?);
/// let token = spotify::auth::auth(AppState::new(store)).await?;
/// println!("Token valid for {}s", token.expires_in);
/// ```
pub async fn auth(state: AppState) -> Result<Token> {
    let code_verifier = utils::generate_code_verifier();
    let code_challenge = utils::generate_code_challenge(&code_verifier);
    let auth_url = authorization_url(&code_challenge)?;

    // Store verifier in shared state before redirect
    state.begin_login(code_verifier).await;

    let server_state = state.clone();
    let server = tokio::spawn(async move { start_api_server(server_state).await });

    if webbrowser::open(&auth_url).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            auth_url
        )
    }

    let token = wait_for_token(Arc::clone(&state.pkce)).await;
    server.abort();

    token.ok_or(Error::AuthExpired)
}

/// Builds the Spotify authorization URL for a PKCE challenge.
///
/// # Arguments
///
/// * `code_challenge` - Base64url encoded SHA256 of the code verifier, as
///   produced by [`utils::generate_code_challenge`]
///
/// # Returns
///
/// The URL to send the user to, or `Error::Config` when one of
/// `SPOTIFY_API_AUTH_URL`, `SPOTIFY_API_AUTH_CLIENT_ID`,
/// `SPOTIFY_API_REDIRECT_URI` or `SPOTIFY_API_AUTH_SCOPE` is not set.
///
/// # URL Parameters
///
/// - `response_type=code`
/// - `code_challenge_method=S256`
/// - `scope` - the configured scopes, spaces encoded as `%20`
///
/// # Example
///
/// ```
/// let verifier = utils::generate_code_verifier();
/// let url = authorization_url(&utils::generate_code_challenge(&verifier))?;
/// // https://accounts.spotify.com/authorize?client_id=...&response_type=code&...
/// ```
pub fn authorization_url(code_challenge: &str) -> Result<String> {
    Ok(format!(
        "{spotify_auth_url}?client_id={client_id}&response_type=code&redirect_uri={redirect_uri}&code_challenge={code_challenge}&code_challenge_method=S256&scope={scope}",
        spotify_auth_url = config::spotify_apiauth_url()?,
        client_id = config::spotify_client_id()?,
        redirect_uri = config::spotify_redirect_uri()?,
        code_challenge = code_challenge,
        scope = config::spotify_scope()?.replace(' ', "%20")
    ))
}

/// Waits for the OAuth callback to complete and return a token.
///
/// Polls the shared state once a second, for at most 60 seconds, until the
/// callback handler has stored a token. The lock is released between polls so
/// the callback can write.
///
/// # Returns
///
/// - `Some(Token)` - The callback finished the exchange in time
/// - `None` - Timed out
async fn wait_for_token(shared_state: Arc<Mutex<Option<PkceToken>>>) -> Option<Token> {
    use std::time::Instant;

    let max_wait = Duration::from_secs(60);
    let start = Instant::now();

    while start.elapsed() < max_wait {
        let lock = shared_state.lock().await;
        if let Some(pkce_token) = lock.as_ref() {
            if let Some(token) = &pkce_token.token {
                return Some(token.clone());
            }
        }
        drop(lock);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    None
}

/// Exchanges a refresh token for a new access token.
///
/// Used by [`TokenManager`](crate::management::TokenManager) when the cached
/// access token is about to expire.
///
/// # Arguments
///
/// * `refresh_token` - Refresh token of the cached credential
///
/// # Returns
///
/// - `Ok(Token)` - Fresh token, stamped with the current time
/// - `Err(Error::AuthExpired)` - The token endpoint rejected the refresh token
/// - `Err(Error::Upstream)` - Network failure or malformed response
///
/// # Token Rotation
///
/// Spotify may or may not rotate the refresh token. When the response carries
/// none, the old one is kept so later refreshes keep working.
///
/// # API Endpoint
///
/// `POST {SPOTIFY_API_TOKEN_URL}` with `grant_type=refresh_token`, form
/// encoded.
///
/// # Example
///
/// ```
/// let token = refresh_token(&cached.refresh_token).await?;
/// TokenManager::new(token).persist().await?;
/// ```
pub async fn refresh_token(refresh_token: &str) -> Result<Token> {
    let client_id = config::spotify_client_id()?;

    let client = Client::new();
    let res = client
        .post(config::spotify_apitoken_url()?)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id.as_str()),
        ])
        .send()
        .await?
        .error_for_status()
        .map_err(|_| Error::AuthExpired)?;

    let json: Value = res.json().await?;
    let mut token = token_from_json(&json)?;
    if token.refresh_token.is_empty() {
        token.refresh_token = refresh_token.to_string();
    }
    Ok(token)
}

/// Exchanges an authorization code for an access token using the PKCE verifier.
///
/// Final step of the authorization code flow, called by the `/callback`
/// handler.
///
/// # Arguments
///
/// * `code` - Authorization code from the callback's query string
/// * `verifier` - Code verifier generated when the login started
///
/// # Returns
///
/// - `Ok(Token)` - Access and refresh token
/// - `Err(Error::AuthExpired)` - Spotify answered 401
/// - `Err(Error::Upstream)` - Invalid or reused code, verifier mismatch, or a
///   network failure
/// - `Err(Error::Config)` - Missing client id, redirect URI or token URL
///
/// # API Endpoint
///
/// `POST {SPOTIFY_API_TOKEN_URL}` with `grant_type=authorization_code`,
/// `client_id`, `code`, `code_verifier` and `redirect_uri`.
///
/// # Security
///
/// The verifier proves that the party redeeming the code is the one that
/// started the flow; authorization codes are single use.
///
/// # Example
///
/// ```
/// let token = exchange_code_pkce(&params["code"], &verifier).await?;
/// ```
pub async fn exchange_code_pkce(code: &str, verifier: &str) -> Result<Token> {
    let client_id = config::spotify_client_id()?;
    let redirect_uri = config::spotify_redirect_uri()?;

    let client = Client::new();
    let res = client
        .post(config::spotify_apitoken_url()?)
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", client_id.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("redirect_uri", redirect_uri.as_str()),
        ])
        .send()
        .await?
        .error_for_status()?;

    let json: Value = res.json().await?;
    token_from_json(&json)
}

/// Builds a [`Token`] from a token endpoint response, stamped with the current time.
///
/// # Arguments
///
/// * `json` - Parsed body of a token endpoint response
///
/// # Returns
///
/// `Error::Upstream` when `access_token` is missing or empty. Missing
/// optional fields fall back to an empty refresh token, an empty scope and an
/// expiry of 3600 seconds.
///
/// # Example
///
/// ```
/// let token = token_from_json(&json!({ "access_token": "BQC...", "expires_in": 3600 }))?;
/// assert_eq!(token.refresh_token, "");
/// ```
pub fn token_from_json(json: &Value) -> Result<Token> {
    let access_token = json["access_token"]
        .as_str()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::Upstream("token response without access_token".into()))?;

    Ok(Token {
        access_token: access_token.to_string(),
        refresh_token: json["refresh_token"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        scope: json["scope"].as_str().unwrap_or_default().to_string(),
        expires_in: json["expires_in"].as_u64().unwrap_or(3600),
        obtained_at: Utc::now().timestamp() as u64,
    })
}
