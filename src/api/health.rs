use axum::{Extension, response::Json};
use serde_json::{Value, json};

use crate::server::AppState;

pub async fn health(Extension(state): Extension<AppState>) -> Json<Value> {
    let store = match state.store.first_user().await {
        Ok(_) => "ok",
        Err(_) => "unavailable",
    };

    Json(json!({
        "status": "ok",
        "store": store,
        "version": env!("CARGO_PKG_VERSION")
    }))
}
