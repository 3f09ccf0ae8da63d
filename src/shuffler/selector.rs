//! Picks the tracks to queue, favouring the ones played the least.

use std::{collections::HashSet, fmt};

use clap::ValueEnum;
use rand::{
    Rng,
    seq::{IndexedRandom, SliceRandom},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    error::{Error, Result},
    management::LedgerStore,
    spotify::MusicService,
    types::TrackRecord,
};

use super::ledger::{compute_average_play_count, require_user};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ShuffleMode {
    /// Queue `amount` tracks.
    #[value(name = "by_count")]
    ByCount,
    /// Queue a third of `amount`; meant for the frequent scheduled run.
    #[value(name = "by_time")]
    ByTime,
}

impl ShuffleMode {
    /// Number of distinct tracks a request for `amount` asks for.
    pub fn target_size(self, amount: u32) -> usize {
        match self {
            ShuffleMode::ByCount => amount as usize,
            ShuffleMode::ByTime => (amount / 3) as usize,
        }
    }
}

impl fmt::Display for ShuffleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShuffleMode::ByCount => f.write_str("by_count"),
            ShuffleMode::ByTime => f.write_str("by_time"),
        }
    }
}

/// Chooses up to `target` track ids and returns them in random order.
///
/// Records played at most `average` times are drawn uniformly first. If they
/// don't reach `target`, the rest comes from records played at least `average`
/// times, least recently played first (never played counts as oldest).
pub fn pick<R>(records: &[TrackRecord], average: i64, target: usize, rng: &mut R) -> Vec<String>
where
    R: Rng + ?Sized,
{
    let under: Vec<&TrackRecord> = records
        .iter()
        .filter(|r| r.played_count <= average)
        .collect();

    let mut picked: Vec<&TrackRecord> = under.choose_multiple(rng, target).copied().collect();

    if picked.len() < target {
        let taken: HashSet<&str> = picked.iter().map(|r| r.recording_id.as_str()).collect();
        let mut stale: Vec<&TrackRecord> = records
            .iter()
            .filter(|r| r.played_count >= average && !taken.contains(r.recording_id.as_str()))
            .collect();
        stale.sort_by(|a, b| {
            a.last_played
                .cmp(&b.last_played)
                .then_with(|| a.recording_id.cmp(&b.recording_id))
        });

        let missing = target - picked.len();
        picked.extend(stale.into_iter().take(missing));
    }

    let mut track_ids: Vec<String> = picked.into_iter().map(|r| r.track_id.clone()).collect();
    track_ids.shuffle(rng);
    track_ids
}

/// Steps up to the submission: validates `amount`, refreshes the stored
/// average and returns the shuffled selection.
pub async fn plan_queue<S>(
    store: &S,
    user_id: &str,
    mode: ShuffleMode,
    amount: u32,
) -> Result<Vec<String>>
where
    S: LedgerStore + ?Sized,
{
    if amount < 1 {
        return Err(Error::Validation("amount must be at least 1".into()));
    }
    require_user(store, user_id).await?;

    let target = mode.target_size(amount);
    let average = compute_average_play_count(store, user_id).await?;
    let records = store.track_records(user_id).await?;

    let track_ids = {
        let mut rng = rand::rng();
        pick(&records, average, target, &mut rng)
    };

    debug!(
        "Picked {} of {} tracks for a {} shuffle (target {}, average {})",
        track_ids.len(),
        records.len(),
        mode,
        target,
        average
    );
    Ok(track_ids)
}

/// Selects tracks for the queue and submits them one by one.
///
/// Returns how many tracks were selected and queued. The first failed
/// submission stops the rest and is reported as [`Error::QueueInterrupted`].
pub async fn select_for_queue<M, S>(
    music: &M,
    store: &S,
    user_id: &str,
    mode: ShuffleMode,
    amount: u32,
) -> Result<usize>
where
    M: MusicService + ?Sized,
    S: LedgerStore + ?Sized,
{
    let track_ids = plan_queue(store, user_id, mode, amount).await?;
    submit(music, &track_ids).await?;

    info!("Queued {} tracks for {} ({})", track_ids.len(), user_id, mode);
    Ok(track_ids.len())
}

/// Enqueues `track_ids` in order, stopping at the first failure.
pub async fn submit<M>(music: &M, track_ids: &[String]) -> Result<usize>
where
    M: MusicService + ?Sized,
{
    for (submitted, track_id) in track_ids.iter().enumerate() {
        if let Err(e) = music.enqueue(track_id).await {
            warn!("Enqueueing {} failed: {}", track_id, e);
            return Err(Error::QueueInterrupted {
                submitted,
                total: track_ids.len(),
                source: Box::new(e),
            });
        }
    }
    Ok(track_ids.len())
}
