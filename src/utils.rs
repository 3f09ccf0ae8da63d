use std::cmp::Ordering;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

use crate::{
    error::{Error, Result},
    types::{HistoryTableRow, TrackRecord},
};

pub fn generate_code_verifier() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(128)
        .map(char::from)
        .collect()
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Accepts a bare playlist id, a `spotify:playlist:` URI or an
/// `open.spotify.com/playlist/` link and returns the id.
///
/// Anything else, including ids with characters outside `[A-Za-z0-9]`, is
/// rejected with [`Error::Validation`] so it never ends up in a request path.
pub fn parse_playlist_id(input: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::Validation("playlist id cannot be empty".to_string()));
    }

    let id = if let Some(rest) = input.strip_prefix("spotify:playlist:") {
        rest
    } else if let Some(pos) = input.find("/playlist/") {
        let rest = &input[pos + "/playlist/".len()..];
        rest.split(['?', '/', '#']).next().unwrap_or_default()
    } else {
        input
    };

    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::Validation(format!("invalid playlist id '{input}'")));
    }
    Ok(id.to_string())
}

pub fn format_last_played(last_played: Option<DateTime<Utc>>) -> String {
    match last_played {
        Some(at) => at.format("%Y-%m-%d %H:%M").to_string(),
        None => "never".to_string(),
    }
}

/// Most played first, then most recently played, then by track id.
pub fn sort_history(records: &mut [TrackRecord]) {
    records.sort_by(|a, b| match b.played_count.cmp(&a.played_count) {
        Ordering::Equal => b
            .last_played
            .cmp(&a.last_played)
            .then_with(|| a.track_id.cmp(&b.track_id)),
        other => other,
    });
}

pub fn history_rows(records: &[TrackRecord]) -> Vec<HistoryTableRow> {
    records
        .iter()
        .map(|r| HistoryTableRow {
            track: r.track_id.clone(),
            played: r.played_count,
            last_played: format_last_played(r.last_played),
        })
        .collect()
}
