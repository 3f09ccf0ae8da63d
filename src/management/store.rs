use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    Pool, Sqlite,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::debug;

use crate::{
    error::{Error, Result},
    types::{TrackRecord, User},
};

const SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS users (
        id                TEXT    PRIMARY KEY,
        display_name      TEXT    NOT NULL,
        average_played    INTEGER NOT NULL DEFAULT 0,
        last_synced_track TEXT
    )",
    "CREATE TABLE IF NOT EXISTS tracked_playlists (
        user_id     TEXT NOT NULL REFERENCES users(id),
        playlist_id TEXT NOT NULL,
        PRIMARY KEY (user_id, playlist_id)
    )",
    "CREATE TABLE IF NOT EXISTS track_history (
        user_id      TEXT    NOT NULL REFERENCES users(id),
        recording_id TEXT    NOT NULL,
        track_id     TEXT    NOT NULL,
        played_count INTEGER NOT NULL DEFAULT 0,
        last_played  TEXT,
        PRIMARY KEY (user_id, recording_id)
    )",
];

/// Everything a reconciliation writes, applied in one transaction.
#[derive(Debug, Clone, Default)]
pub struct LedgerChanges {
    pub playlist_ids: Vec<String>,
    /// Recording ids to delete.
    pub removed: Vec<String>,
    /// `(recording_id, track_id)` pairs to insert with a zero count.
    pub added: Vec<(String, String)>,
    /// Kept records whose catalog track id changed.
    pub retargeted: Vec<(String, String)>,
}

/// Plays counted for one recording during a sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayTally {
    pub recording_id: String,
    pub plays: i64,
    pub last_played: DateTime<Utc>,
}

/// Durable home of users and their track history.
///
/// Every mutating method is one transaction: it either fully commits or
/// returns [`Error::Persistence`] with nothing written.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn user(&self, user_id: &str) -> Result<Option<User>>;

    /// The single tracked account, i.e. the first registered user.
    async fn first_user(&self) -> Result<Option<User>>;

    /// Inserts the user on first login, refreshes the display name afterwards.
    async fn register_user(&self, user_id: &str, display_name: &str) -> Result<User>;

    async fn tracked_playlists(&self, user_id: &str) -> Result<Vec<String>>;

    async fn track_records(&self, user_id: &str) -> Result<Vec<TrackRecord>>;

    async fn apply_reconciliation(&self, user_id: &str, changes: &LedgerChanges) -> Result<()>;

    /// Adds the tallies and moves the last synced marker.
    async fn record_plays(
        &self,
        user_id: &str,
        tallies: &[PlayTally],
        last_synced_track: Option<&str>,
    ) -> Result<()>;

    async fn set_average(&self, user_id: &str, average: i64) -> Result<()>;
}

pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Opens (and creates if missing) the database at `url` and makes sure the
    /// schema exists.
    pub async fn open(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    /// Private database living as long as the store. Handy for tests and dry runs.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // a second connection would see a different, empty database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    async fn init(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("Ledger schema ready");
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn user(&self, user_id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, display_name, average_played, last_synced_track FROM users WHERE id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn first_user(&self) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, display_name, average_played, last_synced_track FROM users ORDER BY rowid LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn register_user(&self, user_id: &str, display_name: &str) -> Result<User> {
        sqlx::query(
            "INSERT INTO users (id, display_name, average_played, last_synced_track)
             VALUES (?1, ?2, 0, NULL)
             ON CONFLICT(id) DO UPDATE SET display_name = excluded.display_name",
        )
        .bind(user_id)
        .bind(display_name)
        .execute(&self.pool)
        .await?;

        self.user(user_id)
            .await?
            .ok_or_else(|| Error::UnknownUser(user_id.to_string()))
    }

    async fn tracked_playlists(&self, user_id: &str) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT playlist_id FROM tracked_playlists WHERE user_id = ?1 ORDER BY playlist_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn track_records(&self, user_id: &str) -> Result<Vec<TrackRecord>> {
        let records = sqlx::query_as::<_, TrackRecord>(
            "SELECT recording_id, track_id, user_id, played_count, last_played
             FROM track_history WHERE user_id = ?1 ORDER BY recording_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn apply_reconciliation(&self, user_id: &str, changes: &LedgerChanges) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for recording_id in &changes.removed {
            sqlx::query("DELETE FROM track_history WHERE user_id = ?1 AND recording_id = ?2")
                .bind(user_id)
                .bind(recording_id)
                .execute(&mut *tx)
                .await?;
        }

        for (recording_id, track_id) in &changes.added {
            sqlx::query(
                "INSERT INTO track_history (user_id, recording_id, track_id, played_count, last_played)
                 VALUES (?1, ?2, ?3, 0, NULL)",
            )
            .bind(user_id)
            .bind(recording_id)
            .bind(track_id)
            .execute(&mut *tx)
            .await?;
        }

        for (recording_id, track_id) in &changes.retargeted {
            sqlx::query(
                "UPDATE track_history SET track_id = ?3 WHERE user_id = ?1 AND recording_id = ?2",
            )
            .bind(user_id)
            .bind(recording_id)
            .bind(track_id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM tracked_playlists WHERE user_id = ?1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for playlist_id in &changes.playlist_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO tracked_playlists (user_id, playlist_id) VALUES (?1, ?2)",
            )
            .bind(user_id)
            .bind(playlist_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn record_plays(
        &self,
        user_id: &str,
        tallies: &[PlayTally],
        last_synced_track: Option<&str>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for tally in tallies {
            sqlx::query(
                "UPDATE track_history
                 SET played_count = played_count + ?3, last_played = ?4
                 WHERE user_id = ?1 AND recording_id = ?2",
            )
            .bind(user_id)
            .bind(&tally.recording_id)
            .bind(tally.plays)
            .bind(tally.last_played)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(track_id) = last_synced_track {
            sqlx::query("UPDATE users SET last_synced_track = ?2 WHERE id = ?1")
                .bind(user_id)
                .bind(track_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn set_average(&self, user_id: &str, average: i64) -> Result<()> {
        let updated = sqlx::query("UPDATE users SET average_played = ?2 WHERE id = ?1")
            .bind(user_id)
            .bind(average)
            .execute(&self.pool)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(Error::UnknownUser(user_id.to_string()));
        }
        Ok(())
    }
}
