//! # API Module
//!
//! HTTP endpoints of the spotishuffler server. Everything answers JSON except
//! the OAuth callback, which shows a short HTML notice in the browser.
//!
//! ## Endpoints
//!
//! ### Authentication
//!
//! - [`login`] - starts the PKCE flow and redirects to Spotify
//! - [`callback`] - exchanges the code, caches the token, registers the user
//! - [`logout`] - forgets the cached token
//!
//! ### Ledger
//!
//! - [`index`] - who is logged in and what is tracked
//! - [`playlists`] - the account's playlists, flagged when tracked
//! - [`tracking`] - replaces the tracked playlists and reconciles the ledger
//! - [`history`] - ledger rows and the current average
//! - [`sync`] - counts the plays of the recently played feed
//!
//! ### Queue
//!
//! - [`shuffle`] - queues an under-played selection
//!
//! ### Monitoring
//!
//! - [`health`] - status and version

mod auth;
mod health;
mod library;
mod queue;

pub use auth::{callback, login, logout};
pub use health::health;
pub use library::{history, index, playlists, tracking};
pub use queue::{shuffle, sync};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::warn;

use crate::{
    error::Error,
    management::LedgerStore,
    spotify::SpotifyClient,
    types::User,
};

/// [`Error`] rendered as a JSON response.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::AuthExpired => StatusCode::UNAUTHORIZED,
            Error::UnknownUser(_) => StatusCode::NOT_FOUND,
            Error::Upstream(_) | Error::QueueInterrupted { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            warn!("Request failed: {}", self.0);
        }

        let mut body = json!({
            "error": self.0.to_string(),
            "reauthorize": self.0.needs_reauth(),
        });
        if let Error::QueueInterrupted { submitted, total, .. } = &self.0 {
            body["submitted"] = json!(submitted);
            body["total"] = json!(total);
        }

        (status, Json(body)).into_response()
    }
}

/// Client for the cached credential and the registered user it belongs to.
async fn active_session(store: &dyn LedgerStore) -> Result<(SpotifyClient, User), ApiError> {
    let client = SpotifyClient::from_cache().await?;
    let me = client.current_user().await?;
    let user = store
        .user(&me.id)
        .await?
        .ok_or(Error::UnknownUser(me.id))?;
    Ok((client, user))
}
