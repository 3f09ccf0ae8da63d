//! Play-count bookkeeping for the tracks of the selected playlists.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    management::{LedgerChanges, LedgerStore, PlayTally},
    spotify::MusicService,
    types::{PlayedEntry, PlaylistEntry, TrackRecord, User},
    utils,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub added: usize,
    pub removed: usize,
    pub kept: usize,
    pub average: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    /// Plays added to the ledger.
    pub counted: usize,
    /// New feed entries that belong to no tracked recording.
    pub unmatched: usize,
    pub last_synced_track: Option<String>,
}

pub(crate) async fn require_user<S>(store: &S, user_id: &str) -> Result<User>
where
    S: LedgerStore + ?Sized,
{
    store
        .user(user_id)
        .await?
        .ok_or_else(|| Error::UnknownUser(user_id.to_string()))
}

/// Follows the cursor of a playlist until the last page and returns every entry.
pub async fn drain_playlist<M>(music: &M, playlist_id: &str) -> Result<Vec<PlaylistEntry>>
where
    M: MusicService + ?Sized,
{
    let mut entries = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = music.playlist_page(playlist_id, cursor.as_deref()).await?;
        entries.extend(page.items);
        match page.next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    debug!("Playlist {} has {} entries", playlist_id, entries.len());
    Ok(entries)
}

/// Makes the ledger match the current content of `playlist_ids`.
///
/// Ids may be given as bare ids, `spotify:playlist:` URIs or playlist links;
/// a malformed one fails with [`Error::Validation`] before anything is fetched.
/// All playlists are fetched completely before anything is written; an
/// upstream failure leaves the store untouched. Deletions, insertions and the
/// new playlist selection commit together.
pub async fn reconcile<M, S>(
    music: &M,
    store: &S,
    user_id: &str,
    playlist_ids: &[String],
) -> Result<ReconcileReport>
where
    M: MusicService + ?Sized,
    S: LedgerStore + ?Sized,
{
    let playlist_ids: Vec<String> = playlist_ids
        .iter()
        .map(|id| utils::parse_playlist_id(id))
        .collect::<Result<BTreeSet<_>>>()?
        .into_iter()
        .collect();

    require_user(store, user_id).await?;

    let mut current: Vec<PlaylistEntry> = Vec::new();
    for playlist_id in &playlist_ids {
        current.extend(drain_playlist(music, playlist_id).await?);
    }

    let existing = store.track_records(user_id).await?;
    let changes = plan_reconciliation(&existing, &current, &playlist_ids);
    let kept = existing.len() - changes.removed.len();

    store.apply_reconciliation(user_id, &changes).await?;
    let average = compute_average_play_count(store, user_id).await?;

    info!(
        "Reconciled {} playlists for {}: {} added, {} removed, {} kept",
        playlist_ids.len(),
        user_id,
        changes.added.len(),
        changes.removed.len(),
        kept
    );

    Ok(ReconcileReport {
        added: changes.added.len(),
        removed: changes.removed.len(),
        kept,
        average,
    })
}

/// Difference between the stored records and the current playlist content.
///
/// Entries without a recording id are skipped. When a recording shows up more
/// than once, the first catalog track id wins.
pub fn plan_reconciliation(
    existing: &[TrackRecord],
    current: &[PlaylistEntry],
    playlist_ids: &[String],
) -> LedgerChanges {
    let mut wanted: BTreeMap<&str, &str> = BTreeMap::new();
    for entry in current {
        if let Some(recording_id) = entry.recording_id.as_deref() {
            wanted.entry(recording_id).or_insert(entry.track_id.as_str());
        }
    }

    let stored: HashMap<&str, &TrackRecord> = existing
        .iter()
        .map(|r| (r.recording_id.as_str(), r))
        .collect();

    let removed = existing
        .iter()
        .filter(|r| !wanted.contains_key(r.recording_id.as_str()))
        .map(|r| r.recording_id.clone())
        .collect();

    let mut added = Vec::new();
    let mut retargeted = Vec::new();
    for (recording_id, track_id) in wanted {
        match stored.get(recording_id) {
            None => added.push((recording_id.to_string(), track_id.to_string())),
            Some(record) if record.track_id != track_id => {
                retargeted.push((recording_id.to_string(), track_id.to_string()))
            }
            Some(_) => {}
        }
    }

    LedgerChanges {
        playlist_ids: playlist_ids.to_vec(),
        removed,
        added,
        retargeted,
    }
}

/// Counts the plays that happened since the previous sync.
///
/// The feed is walked newest first and the walk stops at the track stored as
/// last synced; that entry and everything older was counted before. The
/// newest entry becomes the new marker.
pub async fn sync_recently_played<M, S>(music: &M, store: &S, user_id: &str) -> Result<SyncResult>
where
    M: MusicService + ?Sized,
    S: LedgerStore + ?Sized,
{
    let user = require_user(store, user_id).await?;
    let feed = music.recently_played().await?;
    let records = store.track_records(user_id).await?;

    let (tallies, unmatched) = tally_plays(&feed, user.last_synced_track.as_deref(), &records);
    let counted: usize = tallies.iter().map(|t| t.plays as usize).sum();
    let newest = feed.first().map(|entry| entry.track_id.clone());

    store
        .record_plays(user_id, &tallies, newest.as_deref())
        .await?;

    info!(
        "Synced history for {}: {} plays counted, {} untracked",
        user_id, counted, unmatched
    );

    Ok(SyncResult {
        counted,
        unmatched,
        last_synced_track: newest.or(user.last_synced_track),
    })
}

/// Groups the not yet counted feed entries by recording.
///
/// Returns the tallies for tracked recordings, with `last_played` already
/// raised to the newest of the stored and the fed timestamps, and the number
/// of new entries that match no record.
pub fn tally_plays(
    feed: &[PlayedEntry],
    last_synced_track: Option<&str>,
    records: &[TrackRecord],
) -> (Vec<PlayTally>, usize) {
    let tracked: HashMap<&str, &TrackRecord> = records
        .iter()
        .map(|r| (r.recording_id.as_str(), r))
        .collect();

    let mut tallies: BTreeMap<&str, PlayTally> = BTreeMap::new();
    let mut unmatched = 0;

    for entry in feed {
        if last_synced_track == Some(entry.track_id.as_str()) {
            break;
        }

        let Some(record) = entry
            .recording_id
            .as_deref()
            .and_then(|id| tracked.get(id))
        else {
            unmatched += 1;
            continue;
        };

        let tally = tallies
            .entry(record.recording_id.as_str())
            .or_insert_with(|| PlayTally {
                recording_id: record.recording_id.clone(),
                plays: 0,
                last_played: record
                    .last_played
                    .map_or(entry.played_at, |prev| prev.max(entry.played_at)),
            });
        tally.plays += 1;
        tally.last_played = tally.last_played.max(entry.played_at);
    }

    (tallies.into_values().collect(), unmatched)
}

/// Mean play count of the user's records, truncated, and stored on the user.
pub async fn compute_average_play_count<S>(store: &S, user_id: &str) -> Result<i64>
where
    S: LedgerStore + ?Sized,
{
    let records = store.track_records(user_id).await?;
    let average = average_play_count(&records);
    store.set_average(user_id, average).await?;
    Ok(average)
}

/// `floor(sum / count)`, 0 for no records.
pub fn average_play_count(records: &[TrackRecord]) -> i64 {
    if records.is_empty() {
        return 0;
    }
    let total: i64 = records.iter().map(|r| r.played_count).sum();
    total / records.len() as i64
}
