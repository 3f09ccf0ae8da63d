use crate::{
    error, info,
    shuffler::{self, ShuffleMode, selector},
    success, warning,
};

use super::{open_store, session};

pub async fn shuffle(mode: ShuffleMode, amount: u32, dry_run: bool) {
    let store = open_store().await;
    let (client, user) = session(&store).await;

    let track_ids = match shuffler::plan_queue(store.as_ref(), &user.id, mode, amount).await {
        Ok(ids) => ids,
        Err(e) => error!("Cannot select tracks. Err: {}", e),
    };

    if track_ids.is_empty() {
        warning!(
            "Nothing to queue ({} with amount {} asks for {} tracks).",
            mode,
            amount,
            mode.target_size(amount)
        );
        return;
    }

    if dry_run {
        info!("Would queue {} tracks:", track_ids.len());
        for track_id in &track_ids {
            println!("  spotify:track:{}", track_id);
        }
        return;
    }

    match selector::submit(&client, &track_ids).await {
        Ok(queued) => success!("Queued {} tracks.", queued),
        Err(e) => error!("{}", e),
    }
}
