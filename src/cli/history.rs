use tabled::Table;

use crate::{error, info, management::LedgerStore, shuffler, success, utils, warning};

use super::{open_store, session, spinner};

pub async fn sync() {
    let store = open_store().await;
    let (client, user) = session(&store).await;

    let pb = spinner("Counting recently played tracks...");
    let result = shuffler::sync_recently_played(&client, store.as_ref(), &user.id).await;
    pb.finish_and_clear();

    match result {
        Ok(res) => {
            success!("Counted {} new plays.", res.counted);
            if res.unmatched > 0 {
                info!("{} recent plays are not in a tracked playlist.", res.unmatched);
            }
        }
        Err(e) => error!("Cannot sync the play history. Err: {}", e),
    }
}

pub async fn history(limit: Option<usize>) {
    let store = open_store().await;
    let (_, user) = session(&store).await;

    let mut records = match store.track_records(&user.id).await {
        Ok(records) => records,
        Err(e) => error!("Cannot read the ledger. Err: {}", e),
    };

    if records.is_empty() {
        warning!("No tracks tracked yet. Run spotishuffler track <playlist>.");
        return;
    }

    utils::sort_history(&mut records);
    let total = records.len();
    if let Some(limit) = limit {
        records.truncate(limit);
    }

    println!("{}", Table::new(utils::history_rows(&records)));
    info!(
        "{} tracks tracked, average play count {}, last synced track {}",
        total,
        user.average_played,
        user.last_synced_track.as_deref().unwrap_or("none")
    );
}
