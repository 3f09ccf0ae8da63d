use crate::{config, error, info, scheduler, server::AppState, server::start_api_server};

use super::open_store;

/// Runs the HTTP server and the scheduled sync until the process is stopped.
pub async fn serve(no_schedule: bool) {
    let store = open_store().await;

    if !no_schedule {
        let period = match config::sync_interval() {
            Ok(p) => p,
            Err(e) => error!("{}", e),
        };
        let shuffle_amount = match config::scheduled_shuffle_amount() {
            Ok(a) => a,
            Err(e) => error!("{}", e),
        };
        tokio::spawn(scheduler::run(store.clone(), period, shuffle_amount));
    }

    info!("Starting server, press Ctrl+C to stop.");
    if let Err(e) = start_api_server(AppState::new(store)).await {
        error!("Server stopped. Err: {}", e);
    }
}
