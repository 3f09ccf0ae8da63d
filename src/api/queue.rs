use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    server::AppState,
    shuffler::{self, ShuffleMode, SyncResult},
};

use super::{ApiError, active_session};

#[derive(Debug, Deserialize)]
pub struct ShuffleRequest {
    pub mode: ShuffleMode,
    pub amount: u32,
}

pub async fn sync(Extension(state): Extension<AppState>) -> Result<Json<SyncResult>, ApiError> {
    let (client, user) = active_session(state.store.as_ref()).await?;
    let result = shuffler::sync_recently_played(&client, state.store.as_ref(), &user.id).await?;
    Ok(Json(result))
}

pub async fn shuffle(
    Extension(state): Extension<AppState>,
    Json(request): Json<ShuffleRequest>,
) -> Result<Json<Value>, ApiError> {
    let (client, user) = active_session(state.store.as_ref()).await?;
    let selected = shuffler::select_for_queue(
        &client,
        state.store.as_ref(),
        &user.id,
        request.mode,
        request.amount,
    )
    .await?;

    Ok(Json(json!({
        "mode": request.mode,
        "amount": request.amount,
        "selected": selected,
    })))
}
