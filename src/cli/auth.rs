use crate::{error, management::LedgerStore, server::AppState, spotify, success};

use super::open_store;

pub async fn auth() {
    let store = open_store().await;
    let state = AppState::new(store.clone());

    match spotify::auth::auth(state).await {
        Ok(_) => match store.first_user().await {
            Ok(Some(user)) => success!("Authenticated as {} ({})", user.display_name, user.id),
            _ => success!("Authentication successful!"),
        },
        Err(e) => error!("Authentication failed or timed out. Err: {}", e),
    }
}
