//! Error type shared by the ledger, the selector and the service layer.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Caller input rejected before any state was touched.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The store refused a read or a commit.
    #[error("Store rejected the operation: {0}")]
    Persistence(#[from] sqlx::Error),

    /// Spotify answered with an error or could not be reached.
    #[error("Spotify request failed: {0}")]
    Upstream(String),

    /// No usable credential: never authorized, refresh failed or HTTP 401.
    #[error("Spotify authorization expired. Please run spotishuffler auth")]
    AuthExpired,

    /// A queue submission failed part way through a shuffle.
    #[error("Queue submission stopped after {submitted} of {total} tracks: {source}")]
    QueueInterrupted {
        submitted: usize,
        total: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("User {0} is not registered. Please run spotishuffler auth")]
    UnknownUser(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.status() == Some(reqwest::StatusCode::UNAUTHORIZED) {
            return Error::AuthExpired;
        }
        Error::Upstream(err.to_string())
    }
}

impl Error {
    /// True when the user has to go through the authorization flow again.
    pub fn needs_reauth(&self) -> bool {
        match self {
            Error::AuthExpired | Error::UnknownUser(_) => true,
            Error::QueueInterrupted { source, .. } => source.needs_reauth(),
            _ => false,
        }
    }
}
