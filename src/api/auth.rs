use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::Query,
    response::{Html, Redirect},
};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::{
    config, error,
    management::{LedgerStore, TokenManager},
    server::AppState,
    spotify::{self, SpotifyClient},
    types::{Token, User},
    utils,
};

use super::ApiError;

pub async fn login(Extension(state): Extension<AppState>) -> Result<Redirect, ApiError> {
    let code_verifier = utils::generate_code_verifier();
    let code_challenge = utils::generate_code_challenge(&code_verifier);
    let auth_url = spotify::auth::authorization_url(&code_challenge)?;

    state.begin_login(code_verifier).await;

    Ok(Redirect::to(&auth_url))
}

pub async fn callback(
    Query(params): Query<HashMap<String, String>>,
    Extension(state): Extension<AppState>,
) -> Html<&'static str> {
    let Some(code) = params.get("code") else {
        return Html("<h4>Missing authorization code.</h4>");
    };

    let Some(verifier) = state.pending_verifier().await else {
        return Html("<h4>Missing PKCE code verifier.</h4>");
    };

    let token = match spotify::auth::exchange_code_pkce(code, &verifier).await {
        Ok(token) => token,
        Err(e) => {
            warn!("Token exchange failed: {}", e);
            return Html("<h4>Login failed.</h4>");
        }
    };

    let user = match register(token.clone(), state.store.as_ref()).await {
        Ok(user) => user,
        Err(e) => {
            warn!("Registering the user failed: {}", e);
            return Html("<h4>Login failed.</h4>");
        }
    };
    info!("Logged in as {} ({})", user.display_name, user.id);

    state.complete_login(verifier, token).await;

    Html("<h2>Authentication successful.</h2><p>Close browser window.</p>")
}

pub async fn logout() -> Result<Json<Value>, ApiError> {
    TokenManager::clear().await?;
    Ok(Json(json!({ "logged_out": true })))
}

/// Caches the token and creates the user row on first login.
async fn register(token: Token, store: &dyn LedgerStore) -> error::Result<User> {
    let token_manager = TokenManager::new(token);
    token_manager.persist().await?;

    let client = SpotifyClient::new(config::spotify_apiurl()?, token_manager);
    let me = client.current_user().await?;
    let display_name = me.display_name.unwrap_or_else(|| me.id.clone());
    store.register_user(&me.id, &display_name).await
}
