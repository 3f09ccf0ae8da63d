//! Background task that keeps the ledger current.
//!
//! Every period the task syncs the recently played feed of the tracked
//! account (the first registered user) and, when configured, queues a
//! `by_time` shuffle right after.

use std::{sync::Arc, time::Duration};

use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};

use crate::{
    error::Result,
    management::LedgerStore,
    shuffler::{self, ShuffleMode, SyncResult},
    spotify::{MusicService, SpotifyClient},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub synced: SyncResult,
    /// Tracks queued by the scheduled shuffle, if one ran.
    pub queued: Option<usize>,
}

/// Ticks forever. The first tick runs immediately.
pub async fn run(store: Arc<dyn LedgerStore>, period: Duration, shuffle_amount: Option<u32>) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(
        "History sync scheduled every {}s{}",
        period.as_secs(),
        shuffle_amount.map_or(String::new(), |a| format!(", shuffling {a} afterwards"))
    );

    loop {
        ticker.tick().await;
        match tick(store.as_ref(), shuffle_amount).await {
            Ok(Some(report)) => info!(
                "Scheduled sync counted {} plays{}",
                report.synced.counted,
                report
                    .queued
                    .map_or(String::new(), |q| format!(", queued {q} tracks"))
            ),
            Ok(None) => info!("No user registered yet, skipping scheduled sync"),
            Err(e) if e.needs_reauth() => warn!("Skipping scheduled sync: {}", e),
            Err(e) => error!("Scheduled sync failed: {}", e),
        }
    }
}

/// One scheduled run for the tracked account. `None` when nobody logged in yet.
pub async fn tick(store: &dyn LedgerStore, shuffle_amount: Option<u32>) -> Result<Option<CycleReport>> {
    let Some(user) = store.first_user().await? else {
        return Ok(None);
    };

    let client = SpotifyClient::from_cache().await?;
    run_cycle(&client, store, &user.id, shuffle_amount)
        .await
        .map(Some)
}

/// Sync, then the optional shuffle. A failed sync skips the shuffle.
pub async fn run_cycle<M, S>(
    music: &M,
    store: &S,
    user_id: &str,
    shuffle_amount: Option<u32>,
) -> Result<CycleReport>
where
    M: MusicService + ?Sized,
    S: LedgerStore + ?Sized,
{
    let synced = shuffler::sync_recently_played(music, store, user_id).await?;

    let queued = match shuffle_amount {
        Some(amount) => Some(
            shuffler::select_for_queue(music, store, user_id, ShuffleMode::ByTime, amount).await?,
        ),
        None => None,
    };

    Ok(CycleReport { synced, queued })
}
