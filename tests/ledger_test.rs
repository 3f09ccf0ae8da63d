mod common;

use common::{
    FakeMusic, RejectingStore, USER, at, entry, local_file, played, seed, store_with_user,
};
use spotishuffler::{
    Error,
    management::LedgerStore,
    shuffler::{self, ledger},
    types::TrackRecord,
};

fn ids(records: &[TrackRecord]) -> Vec<&str> {
    records.iter().map(|r| r.recording_id.as_str()).collect()
}

fn record(records: &[TrackRecord], isrc: &str) -> TrackRecord {
    records
        .iter()
        .find(|r| r.recording_id == isrc)
        .cloned()
        .unwrap_or_else(|| panic!("no record for {isrc}"))
}

fn selection(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_reconcile_replaces_removed_and_keeps_counts() {
    let store = store_with_user().await;
    let music = FakeMusic::new();

    music.set_playlist("mix", vec![vec![entry("ISRC-A", "a"), entry("ISRC-B", "b")]]);
    shuffler::reconcile(&music, &store, USER, &selection(&["mix"]))
        .await
        .unwrap();

    // B gets played before the playlist changes
    music.set_feed(vec![played("ISRC-B", "b", 5)]);
    shuffler::sync_recently_played(&music, &store, USER)
        .await
        .unwrap();

    music.set_playlist("mix", vec![vec![entry("ISRC-B", "b"), entry("ISRC-C", "c")]]);
    let report = shuffler::reconcile(&music, &store, USER, &selection(&["mix"]))
        .await
        .unwrap();

    assert_eq!(report.added, 1);
    assert_eq!(report.removed, 1);
    assert_eq!(report.kept, 1);

    let records = store.track_records(USER).await.unwrap();
    assert_eq!(ids(&records), vec!["ISRC-B", "ISRC-C"]);
    assert_eq!(record(&records, "ISRC-B").played_count, 1);
    assert_eq!(record(&records, "ISRC-B").last_played, Some(at(5)));
    assert_eq!(record(&records, "ISRC-C").played_count, 0);
    assert_eq!(record(&records, "ISRC-C").last_played, None);
}

#[tokio::test]
async fn test_reconcile_is_idempotent() {
    let store = store_with_user().await;
    let music = FakeMusic::new();
    music.set_playlist("one", vec![vec![entry("ISRC-A", "a"), entry("ISRC-B", "b")]]);
    music.set_playlist("two", vec![vec![entry("ISRC-B", "b"), entry("ISRC-C", "c")]]);
    let playlists = selection(&["one", "two"]);

    shuffler::reconcile(&music, &store, USER, &playlists)
        .await
        .unwrap();
    let first = store.track_records(USER).await.unwrap();

    let report = shuffler::reconcile(&music, &store, USER, &playlists)
        .await
        .unwrap();
    let second = store.track_records(USER).await.unwrap();

    assert_eq!(report.added, 0);
    assert_eq!(report.removed, 0);
    assert_eq!(report.kept, 3);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_reconcile_drains_every_page_and_dedupes() {
    let store = store_with_user().await;
    let music = FakeMusic::new();
    music.set_playlist(
        "long",
        vec![
            vec![entry("ISRC-A", "a"), entry("ISRC-B", "b")],
            vec![entry("ISRC-A", "a-remaster"), local_file("local")],
            vec![entry("ISRC-C", "c")],
        ],
    );

    let report = shuffler::reconcile(&music, &store, USER, &selection(&["long"]))
        .await
        .unwrap();

    assert_eq!(report.added, 3);
    assert_eq!(
        music
            .page_requests
            .load(std::sync::atomic::Ordering::SeqCst),
        3
    );

    let records = store.track_records(USER).await.unwrap();
    assert_eq!(ids(&records), vec!["ISRC-A", "ISRC-B", "ISRC-C"]);
    // first occurrence wins
    assert_eq!(record(&records, "ISRC-A").track_id, "a");
}

#[tokio::test]
async fn test_reconcile_persists_selected_playlists() {
    let store = store_with_user().await;
    let music = FakeMusic::new();
    music.set_playlist("one", vec![vec![entry("ISRC-A", "a")]]);
    music.set_playlist("two", vec![vec![entry("ISRC-B", "b")]]);

    shuffler::reconcile(&music, &store, USER, &selection(&["two", "one", "two"]))
        .await
        .unwrap();
    assert_eq!(store.tracked_playlists(USER).await.unwrap(), vec!["one", "two"]);

    shuffler::reconcile(&music, &store, USER, &selection(&["one"]))
        .await
        .unwrap();
    assert_eq!(store.tracked_playlists(USER).await.unwrap(), vec!["one"]);
    assert_eq!(ids(&store.track_records(USER).await.unwrap()), vec!["ISRC-A"]);
}

#[tokio::test]
async fn test_reconcile_failure_mid_fetch_writes_nothing() {
    let store = store_with_user().await;
    let music = FakeMusic::new();
    music.set_playlist("mix", vec![vec![entry("ISRC-A", "a")]]);
    shuffler::reconcile(&music, &store, USER, &selection(&["mix"]))
        .await
        .unwrap();

    music.set_playlist(
        "mix",
        vec![vec![entry("ISRC-B", "b")], vec![entry("ISRC-C", "c")]],
    );
    music.fail_page("mix", 1);

    let result = shuffler::reconcile(&music, &store, USER, &selection(&["mix"])).await;
    assert!(matches!(result, Err(Error::Upstream(_))));

    assert_eq!(ids(&store.track_records(USER).await.unwrap()), vec!["ISRC-A"]);
    assert_eq!(store.tracked_playlists(USER).await.unwrap(), vec!["mix"]);
}

#[tokio::test]
async fn test_reconcile_updates_changed_track_id() {
    let store = store_with_user().await;
    seed(&store, &[("ISRC-A", "old-id", 3, Some(1))]).await;

    let music = FakeMusic::new();
    music.set_playlist("mix", vec![vec![entry("ISRC-A", "new-id")]]);
    let report = shuffler::reconcile(&music, &store, USER, &selection(&["mix"]))
        .await
        .unwrap();

    assert_eq!(report.kept, 1);
    let a = record(&store.track_records(USER).await.unwrap(), "ISRC-A");
    assert_eq!(a.track_id, "new-id");
    assert_eq!(a.played_count, 3);
}

#[tokio::test]
async fn test_reconcile_unknown_user() {
    let store = store_with_user().await;
    let music = FakeMusic::new();

    let result = shuffler::reconcile(&music, &store, "stranger", &selection(&["mix"])).await;
    assert!(matches!(result, Err(Error::UnknownUser(id)) if id == "stranger"));
    assert_eq!(
        music
            .page_requests
            .load(std::sync::atomic::Ordering::SeqCst),
        0
    );
}

#[tokio::test]
async fn test_reconcile_rejects_malformed_playlist_id() {
    let store = store_with_user().await;
    let music = FakeMusic::new();
    music.set_playlist("mix", vec![vec![entry("ISRC-A", "a")]]);
    shuffler::reconcile(&music, &store, USER, &selection(&["mix"]))
        .await
        .unwrap();
    let requests_before = music
        .page_requests
        .load(std::sync::atomic::Ordering::SeqCst);

    let result =
        shuffler::reconcile(&music, &store, USER, &selection(&["mix", "../me/player?x=1"])).await;

    assert!(matches!(result, Err(Error::Validation(_))));
    assert_eq!(
        music
            .page_requests
            .load(std::sync::atomic::Ordering::SeqCst),
        requests_before
    );
    assert_eq!(store.tracked_playlists(USER).await.unwrap(), vec!["mix"]);
    assert_eq!(ids(&store.track_records(USER).await.unwrap()), vec!["ISRC-A"]);
}

#[tokio::test]
async fn test_reconcile_accepts_uris_and_links() {
    let store = store_with_user().await;
    let music = FakeMusic::new();
    music.set_playlist("mix", vec![vec![entry("ISRC-A", "a")]]);
    music.set_playlist("chill", vec![vec![entry("ISRC-B", "b")]]);

    shuffler::reconcile(
        &music,
        &store,
        USER,
        &selection(&[
            "spotify:playlist:mix",
            "https://open.spotify.com/playlist/chill?si=abc",
            "mix",
        ]),
    )
    .await
    .unwrap();

    assert_eq!(store.tracked_playlists(USER).await.unwrap(), vec!["chill", "mix"]);
    assert_eq!(
        ids(&store.track_records(USER).await.unwrap()),
        vec!["ISRC-A", "ISRC-B"]
    );
}

#[tokio::test]
async fn test_reconcile_store_failure_keeps_ledger() {
    let store = store_with_user().await;
    let music = FakeMusic::new();
    music.set_playlist("mix", vec![vec![entry("ISRC-A", "a")]]);
    shuffler::reconcile(&music, &store, USER, &selection(&["mix"]))
        .await
        .unwrap();

    let rejecting = RejectingStore::new(store);
    music.set_playlist("mix", vec![vec![entry("ISRC-B", "b")]]);
    music.set_playlist("other", vec![vec![entry("ISRC-C", "c")]]);

    let result =
        shuffler::reconcile(&music, &rejecting, USER, &selection(&["mix", "other"])).await;

    assert!(matches!(result, Err(Error::Persistence(_))));
    let store = &rejecting.inner;
    assert_eq!(ids(&store.track_records(USER).await.unwrap()), vec!["ISRC-A"]);
    assert_eq!(store.tracked_playlists(USER).await.unwrap(), vec!["mix"]);
}

#[tokio::test]
async fn test_sync_counts_everything_on_first_run() {
    let store = store_with_user().await;
    seed(&store, &[("ISRC-A", "a", 0, None), ("ISRC-B", "b", 0, None)]).await;

    let music = FakeMusic::new();
    music.set_feed(vec![
        played("ISRC-A", "a", 30),
        played("ISRC-X", "x", 20),
        played("ISRC-B", "b", 10),
        played("ISRC-A", "a", 0),
    ]);

    let result = shuffler::sync_recently_played(&music, &store, USER)
        .await
        .unwrap();

    assert_eq!(result.counted, 3);
    assert_eq!(result.unmatched, 1);
    assert_eq!(result.last_synced_track.as_deref(), Some("a"));

    let records = store.track_records(USER).await.unwrap();
    assert_eq!(record(&records, "ISRC-A").played_count, 2);
    assert_eq!(record(&records, "ISRC-A").last_played, Some(at(30)));
    assert_eq!(record(&records, "ISRC-B").played_count, 1);
    assert_eq!(record(&records, "ISRC-B").last_played, Some(at(10)));

    let user = store.user(USER).await.unwrap().unwrap();
    assert_eq!(user.last_synced_track.as_deref(), Some("a"));
}

#[tokio::test]
async fn test_sync_stops_at_last_synced_track() {
    let store = store_with_user().await;
    seed(&store, &[("ISRC-A", "a", 0, None), ("ISRC-B", "b", 0, None)]).await;
    let music = FakeMusic::new();

    music.set_feed(vec![played("ISRC-B", "b", 10), played("ISRC-A", "a", 0)]);
    shuffler::sync_recently_played(&music, &store, USER)
        .await
        .unwrap();

    // two new plays on top of the already counted ones
    music.set_feed(vec![
        played("ISRC-A", "a", 40),
        played("ISRC-A", "a", 30),
        played("ISRC-B", "b", 10),
        played("ISRC-A", "a", 0),
    ]);
    let result = shuffler::sync_recently_played(&music, &store, USER)
        .await
        .unwrap();

    assert_eq!(result.counted, 2);
    let records = store.track_records(USER).await.unwrap();
    assert_eq!(record(&records, "ISRC-A").played_count, 3);
    assert_eq!(record(&records, "ISRC-B").played_count, 1);
    assert_eq!(record(&records, "ISRC-A").last_played, Some(at(40)));
}

#[tokio::test]
async fn test_sync_twice_without_new_plays_counts_nothing() {
    let store = store_with_user().await;
    seed(&store, &[("ISRC-A", "a", 0, None)]).await;
    let music = FakeMusic::new();
    music.set_feed(vec![played("ISRC-A", "a", 10), played("ISRC-A", "a", 0)]);

    shuffler::sync_recently_played(&music, &store, USER)
        .await
        .unwrap();
    let again = shuffler::sync_recently_played(&music, &store, USER)
        .await
        .unwrap();

    assert_eq!(again.counted, 0);
    assert_eq!(again.last_synced_track.as_deref(), Some("a"));
    let records = store.track_records(USER).await.unwrap();
    assert_eq!(record(&records, "ISRC-A").played_count, 2);
}

#[tokio::test]
async fn test_sync_with_empty_feed_keeps_marker() {
    let store = store_with_user().await;
    seed(&store, &[("ISRC-A", "a", 0, None)]).await;
    let music = FakeMusic::new();
    music.set_feed(vec![played("ISRC-A", "a", 0)]);
    shuffler::sync_recently_played(&music, &store, USER)
        .await
        .unwrap();

    music.set_feed(Vec::new());
    let result = shuffler::sync_recently_played(&music, &store, USER)
        .await
        .unwrap();

    assert_eq!(result.counted, 0);
    assert_eq!(result.last_synced_track.as_deref(), Some("a"));
    let user = store.user(USER).await.unwrap().unwrap();
    assert_eq!(user.last_synced_track.as_deref(), Some("a"));
}

#[tokio::test]
async fn test_sync_never_moves_last_played_backwards() {
    let store = store_with_user().await;
    seed(&store, &[("ISRC-A", "a", 4, Some(100))]).await;
    let music = FakeMusic::new();
    music.set_feed(vec![played("ISRC-A", "a", 50)]);

    shuffler::sync_recently_played(&music, &store, USER)
        .await
        .unwrap();

    let a = record(&store.track_records(USER).await.unwrap(), "ISRC-A");
    assert_eq!(a.played_count, 5);
    assert_eq!(a.last_played, Some(at(100)));
}

#[tokio::test]
async fn test_sync_store_failure_keeps_counts_and_marker() {
    let store = store_with_user().await;
    seed(&store, &[("ISRC-A", "a", 2, Some(5))]).await;
    let rejecting = RejectingStore::new(store);
    let music = FakeMusic::new();
    music.set_feed(vec![played("ISRC-A", "a", 20), played("ISRC-A", "a", 10)]);

    let result = shuffler::sync_recently_played(&music, &rejecting, USER).await;

    assert!(matches!(result, Err(Error::Persistence(_))));
    let store = &rejecting.inner;
    let a = record(&store.track_records(USER).await.unwrap(), "ISRC-A");
    assert_eq!(a.played_count, 2);
    assert_eq!(a.last_played, Some(at(5)));
    let user = store.user(USER).await.unwrap().unwrap();
    assert_eq!(user.last_synced_track, None);
}

#[test]
fn test_tally_plays_ignores_entries_at_or_before_marker() {
    let records = vec![TrackRecord {
        recording_id: "ISRC-A".into(),
        track_id: "a".into(),
        user_id: USER.into(),
        played_count: 0,
        last_played: None,
    }];
    let feed = vec![
        played("ISRC-A", "a", 30),
        played("ISRC-B", "b", 20),
        played("ISRC-A", "a", 10),
    ];

    let (tallies, unmatched) = ledger::tally_plays(&feed, Some("b"), &records);
    assert_eq!(tallies.len(), 1);
    assert_eq!(tallies[0].plays, 1);
    assert_eq!(tallies[0].last_played, at(30));
    assert_eq!(unmatched, 0);

    let (tallies, _) = ledger::tally_plays(&feed, Some("a"), &records);
    assert!(tallies.is_empty());
}

#[tokio::test]
async fn test_average_is_truncated_mean_and_persisted() {
    let store = store_with_user().await;
    seed(
        &store,
        &[
            ("ISRC-A", "a", 1, Some(0)),
            ("ISRC-B", "b", 2, Some(0)),
            ("ISRC-C", "c", 4, Some(0)),
        ],
    )
    .await;

    let average = shuffler::compute_average_play_count(&store, USER)
        .await
        .unwrap();

    assert_eq!(average, 2); // 7 / 3
    let user = store.user(USER).await.unwrap().unwrap();
    assert_eq!(user.average_played, 2);
}

#[tokio::test]
async fn test_average_without_records_is_zero() {
    let store = store_with_user().await;

    let average = shuffler::compute_average_play_count(&store, USER)
        .await
        .unwrap();

    assert_eq!(average, 0);
}

#[tokio::test]
async fn test_average_store_failure_keeps_stored_value() {
    let store = store_with_user().await;
    seed(&store, &[("ISRC-A", "a", 4, Some(0)), ("ISRC-B", "b", 6, Some(1))]).await;
    let rejecting = RejectingStore::new(store);

    let result = shuffler::compute_average_play_count(&rejecting, USER).await;

    assert!(matches!(result, Err(Error::Persistence(_))));
    let user = rejecting.inner.user(USER).await.unwrap().unwrap();
    assert_eq!(user.average_played, 0);
}
