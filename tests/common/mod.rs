#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use spotishuffler::{
    Error, Result,
    management::{LedgerChanges, LedgerStore, PlayTally, SqliteStore},
    spotify::MusicService,
    types::{Page, PlayedEntry, PlaylistEntry, TrackRecord, User},
};

pub const USER: &str = "listener";

/// Scripted stand-in for the Spotify client.
#[derive(Default)]
pub struct FakeMusic {
    /// Pages per playlist id.
    pub playlists: Mutex<HashMap<String, Vec<Vec<PlaylistEntry>>>>,
    /// `(playlist_id, page_index)` whose fetch fails.
    pub failing_page: Mutex<Option<(String, usize)>>,
    pub feed: Mutex<Vec<PlayedEntry>>,
    pub queued: Mutex<Vec<String>>,
    /// Number of successful enqueues before the next one fails.
    pub enqueue_budget: Mutex<Option<usize>>,
    pub page_requests: AtomicUsize,
    pub enqueue_calls: AtomicUsize,
}

impl FakeMusic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_playlist(&self, playlist_id: &str, pages: Vec<Vec<PlaylistEntry>>) {
        self.playlists
            .lock()
            .unwrap()
            .insert(playlist_id.to_string(), pages);
    }

    pub fn fail_page(&self, playlist_id: &str, page: usize) {
        *self.failing_page.lock().unwrap() = Some((playlist_id.to_string(), page));
    }

    pub fn set_feed(&self, feed: Vec<PlayedEntry>) {
        *self.feed.lock().unwrap() = feed;
    }

    pub fn fail_enqueue_after(&self, successes: usize) {
        *self.enqueue_budget.lock().unwrap() = Some(successes);
    }

    pub fn queued(&self) -> Vec<String> {
        self.queued.lock().unwrap().clone()
    }
}

#[async_trait]
impl MusicService for FakeMusic {
    async fn playlist_page(
        &self,
        playlist_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<PlaylistEntry>> {
        self.page_requests.fetch_add(1, Ordering::SeqCst);
        let index = match cursor {
            Some(c) => c
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .expect("cursor handed out by the fake"),
            None => 0,
        };

        if let Some((failing, page)) = self.failing_page.lock().unwrap().as_ref() {
            if failing == playlist_id && *page == index {
                return Err(Error::Upstream("502 Bad Gateway".into()));
            }
        }

        let playlists = self.playlists.lock().unwrap();
        let pages = playlists
            .get(playlist_id)
            .ok_or_else(|| Error::Upstream(format!("404: no playlist {playlist_id}")))?;
        let items = pages.get(index).cloned().unwrap_or_default();
        let next = (index + 1 < pages.len()).then(|| format!("page-{}", index + 1));
        Ok(Page { items, next })
    }

    async fn recently_played(&self) -> Result<Vec<PlayedEntry>> {
        Ok(self.feed.lock().unwrap().clone())
    }

    async fn enqueue(&self, track_id: &str) -> Result<()> {
        self.enqueue_calls.fetch_add(1, Ordering::SeqCst);
        let mut budget = self.enqueue_budget.lock().unwrap();
        if let Some(left) = budget.as_mut() {
            if *left == 0 {
                return Err(Error::Upstream("404: no active device".into()));
            }
            *left -= 1;
        }
        self.queued.lock().unwrap().push(track_id.to_string());
        Ok(())
    }
}

/// Store whose reads go to a working SQLite store and whose ledger writes
/// are refused, as if the pool had gone away.
pub struct RejectingStore {
    pub inner: SqliteStore,
}

impl RejectingStore {
    pub fn new(inner: SqliteStore) -> Self {
        Self { inner }
    }
}

fn rejected() -> Error {
    Error::Persistence(sqlx::Error::PoolClosed)
}

#[async_trait]
impl LedgerStore for RejectingStore {
    async fn user(&self, user_id: &str) -> Result<Option<User>> {
        self.inner.user(user_id).await
    }

    async fn first_user(&self) -> Result<Option<User>> {
        self.inner.first_user().await
    }

    async fn register_user(&self, user_id: &str, display_name: &str) -> Result<User> {
        self.inner.register_user(user_id, display_name).await
    }

    async fn tracked_playlists(&self, user_id: &str) -> Result<Vec<String>> {
        self.inner.tracked_playlists(user_id).await
    }

    async fn track_records(&self, user_id: &str) -> Result<Vec<TrackRecord>> {
        self.inner.track_records(user_id).await
    }

    async fn apply_reconciliation(&self, _user_id: &str, _changes: &LedgerChanges) -> Result<()> {
        Err(rejected())
    }

    async fn record_plays(
        &self,
        _user_id: &str,
        _tallies: &[PlayTally],
        _last_synced_track: Option<&str>,
    ) -> Result<()> {
        Err(rejected())
    }

    async fn set_average(&self, _user_id: &str, _average: i64) -> Result<()> {
        Err(rejected())
    }
}

pub fn entry(isrc: &str, track_id: &str) -> PlaylistEntry {
    PlaylistEntry {
        recording_id: Some(isrc.to_string()),
        track_id: track_id.to_string(),
    }
}

pub fn local_file(track_id: &str) -> PlaylistEntry {
    PlaylistEntry {
        recording_id: None,
        track_id: track_id.to_string(),
    }
}

pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes)
}

pub fn played(isrc: &str, track_id: &str, minute: i64) -> PlayedEntry {
    PlayedEntry {
        recording_id: Some(isrc.to_string()),
        track_id: track_id.to_string(),
        played_at: at(minute),
    }
}

pub async fn store_with_user() -> SqliteStore {
    let store = SqliteStore::in_memory().await.unwrap();
    store.register_user(USER, "Listener").await.unwrap();
    store
}

/// Inserts records `(isrc, track_id, played_count, last_played_minute)`.
pub async fn seed(store: &SqliteStore, records: &[(&str, &str, i64, Option<i64>)]) {
    let changes = LedgerChanges {
        playlist_ids: vec!["seeded".to_string()],
        removed: Vec::new(),
        added: records
            .iter()
            .map(|(isrc, track, _, _)| (isrc.to_string(), track.to_string()))
            .collect(),
        retargeted: Vec::new(),
    };
    store.apply_reconciliation(USER, &changes).await.unwrap();

    let tallies: Vec<PlayTally> = records
        .iter()
        .filter(|(_, _, count, _)| *count > 0)
        .map(|(isrc, _, count, minute)| PlayTally {
            recording_id: isrc.to_string(),
            plays: *count,
            last_played: at(minute.unwrap_or(0)),
        })
        .collect();
    store.record_plays(USER, &tallies, None).await.unwrap();
}
