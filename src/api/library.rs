use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    management::TokenManager,
    server::AppState,
    shuffler::{self, ReconcileReport},
    types::TrackRecord,
};

use super::{ApiError, active_session};

#[derive(Debug, Serialize)]
pub struct PlaylistView {
    pub id: String,
    pub name: String,
    pub total_tracks: u64,
    pub tracked: bool,
}

#[derive(Debug, Deserialize)]
pub struct TrackingRequest {
    pub playlist_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryView {
    pub average_played: i64,
    pub last_synced_track: Option<String>,
    pub tracks: Vec<TrackRecord>,
}

pub async fn index(Extension(state): Extension<AppState>) -> Result<Json<Value>, ApiError> {
    let authorized = TokenManager::load().await.is_ok();
    let Some(user) = state.store.first_user().await? else {
        return Ok(Json(json!({ "authorized": authorized, "user": null })));
    };

    let tracked = state.store.tracked_playlists(&user.id).await?;
    Ok(Json(json!({
        "authorized": authorized,
        "user": user,
        "tracked_playlists": tracked,
    })))
}

pub async fn playlists(
    Extension(state): Extension<AppState>,
) -> Result<Json<Vec<PlaylistView>>, ApiError> {
    let (client, user) = active_session(state.store.as_ref()).await?;
    let tracked = state.store.tracked_playlists(&user.id).await?;

    let views = client
        .user_playlists()
        .await?
        .into_iter()
        .map(|p| PlaylistView {
            tracked: tracked.contains(&p.id),
            id: p.id,
            name: p.name,
            total_tracks: p.total_tracks,
        })
        .collect();

    Ok(Json(views))
}

pub async fn tracking(
    Extension(state): Extension<AppState>,
    Json(request): Json<TrackingRequest>,
) -> Result<Json<ReconcileReport>, ApiError> {
    let (client, user) = active_session(state.store.as_ref()).await?;
    let report =
        shuffler::reconcile(&client, state.store.as_ref(), &user.id, &request.playlist_ids).await?;
    Ok(Json(report))
}

pub async fn history(Extension(state): Extension<AppState>) -> Result<Json<HistoryView>, ApiError> {
    let (_, user) = active_session(state.store.as_ref()).await?;
    let tracks = state.store.track_records(&user.id).await?;

    Ok(Json(HistoryView {
        average_played: user.average_played,
        last_synced_track: user.last_synced_track,
        tracks,
    }))
}
