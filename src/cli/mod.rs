//! # CLI Module
//!
//! User-facing commands of spotishuffler. Each command opens the ledger store,
//! builds a Spotify client from the cached token where it needs one, calls
//! into [`crate::shuffler`] and prints the outcome.
//!
//! ## Commands
//!
//! - [`auth`] - OAuth 2.0 PKCE login; registers the account in the ledger
//! - [`serve`] - HTTP server plus the scheduled history sync
//! - [`playlists`] - the account's playlists, tracked ones marked
//! - [`track`] - replaces the tracked playlists and reconciles the ledger
//! - [`sync`] - counts the plays of the recently played feed
//! - [`history`] - ledger table with the average play count
//! - [`shuffle`] - queues an under-played selection
//!
//! ## Usage Patterns
//!
//! ```bash
//! spotishuffler auth                          # Authenticate with Spotify
//! spotishuffler playlists                     # Find the playlists to track
//! spotishuffler track 37i9dQZF1DXcBWIGoYBM5M  # Track them
//! spotishuffler sync                          # Count recent plays
//! spotishuffler shuffle --amount 30           # Queue 30 under-played tracks
//! spotishuffler serve                         # Keep syncing in the background
//! ```
//!
//! Errors are printed with the crate's `warning!`/`error!` macros; a missing
//! or expired credential points the user at `spotishuffler auth`.

mod auth;
mod history;
mod playlists;
mod serve;
mod shuffle;

pub use auth::auth;
pub use history::history;
pub use history::sync;
pub use playlists::playlists;
pub use playlists::track;
pub use serve::serve;
pub use shuffle::shuffle;

use std::{sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    config, error,
    management::{LedgerStore, SqliteStore},
    spotify::SpotifyClient,
    types::User,
};

async fn open_store() -> Arc<SqliteStore> {
    match SqliteStore::open(&config::database_url()).await {
        Ok(store) => Arc::new(store),
        Err(e) => error!("Cannot open the ledger database. Err: {}", e),
    }
}

/// Client for the cached token and the registered user it belongs to.
async fn session(store: &SqliteStore) -> (SpotifyClient, User) {
    let client = match SpotifyClient::from_cache().await {
        Ok(client) => client,
        Err(e) => error!("Failed to load token. Please run spotishuffler auth\n Error: {}", e),
    };

    let me = match client.current_user().await {
        Ok(me) => me,
        Err(e) => error!("Cannot fetch the current Spotify user. Err: {}", e),
    };

    match store.user(&me.id).await {
        Ok(Some(user)) => (client, user),
        Ok(None) => error!(
            "{} is not registered yet. Please run spotishuffler auth",
            me.id
        ),
        Err(e) => error!("Cannot read the ledger. Err: {}", e),
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb
}
