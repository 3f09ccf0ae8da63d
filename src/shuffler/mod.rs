//! # Shuffler
//!
//! The play-count aware part of spotishuffler.
//!
//! - [`ledger`] keeps one record per recording (ISRC) found in the selected
//!   playlists, counts plays from the recently played feed and computes the
//!   average play count.
//! - [`selector`] draws the under-played tracks first, tops up with the
//!   stalest over-played ones and queues the result in random order.
//!
//! Both work on explicitly passed collaborators: a [`MusicService`] and a
//! [`LedgerStore`]. Each call is one read/compute/write cycle against the store.
//!
//! [`MusicService`]: crate::spotify::MusicService
//! [`LedgerStore`]: crate::management::LedgerStore

pub mod ledger;
pub mod selector;

pub use ledger::{
    ReconcileReport, SyncResult, compute_average_play_count, reconcile, sync_recently_played,
};
pub use selector::{ShuffleMode, plan_queue, select_for_queue};
