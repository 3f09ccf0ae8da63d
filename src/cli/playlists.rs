use tabled::Table;

use crate::{
    error, info,
    management::LedgerStore,
    shuffler, success,
    types::PlaylistTableRow,
    utils, warning,
};

use super::{open_store, session, spinner};

pub async fn playlists(search: Option<String>) {
    let store = open_store().await;
    let (client, user) = session(&store).await;

    let tracked = match store.tracked_playlists(&user.id).await {
        Ok(ids) => ids,
        Err(e) => {
            warning!("Cannot read tracked playlists. Err: {}", e);
            Vec::new()
        }
    };

    let pb = spinner("Fetching playlists...");
    let mut playlists = match client.user_playlists().await {
        Ok(p) => p,
        Err(e) => {
            pb.finish_and_clear();
            error!("Cannot fetch playlists. Err: {}", e)
        }
    };
    pb.finish_and_clear();

    playlists.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    if let Some(search) = search {
        let search_term = search.to_lowercase();
        playlists.retain(|p| p.name.to_lowercase().contains(&search_term));
    }

    let table_rows: Vec<PlaylistTableRow> = playlists
        .into_iter()
        .map(|p| PlaylistTableRow {
            tracked: if tracked.contains(&p.id) { "✓" } else { "" }.to_string(),
            name: p.name,
            tracks: p.total_tracks,
            id: p.id,
        })
        .collect();

    println!("{}", Table::new(table_rows));
}

pub async fn track(playlists: Vec<String>) {
    let mut playlist_ids = Vec::with_capacity(playlists.len());
    for raw in &playlists {
        match utils::parse_playlist_id(raw) {
            Ok(id) => playlist_ids.push(id),
            Err(e) => error!("{}", e),
        }
    }

    let store = open_store().await;
    let (client, user) = session(&store).await;

    if playlist_ids.is_empty() {
        warning!("No playlist given, every tracked track will be dropped from the ledger.");
    }

    let pb = spinner("Reconciling tracked playlists...");
    let result = shuffler::reconcile(&client, store.as_ref(), &user.id, &playlist_ids).await;
    pb.finish_and_clear();

    match result {
        Ok(report) => {
            success!(
                "Tracking {} playlists: {} added, {} removed, {} kept",
                playlist_ids.len(),
                report.added,
                report.removed,
                report.kept
            );
            info!("Average play count is now {}", report.average);
        }
        Err(e) => error!("Cannot reconcile playlists. Err: {}", e),
    }
}
