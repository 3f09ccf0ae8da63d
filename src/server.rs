use axum::{
    Extension, Router,
    routing::{get, post},
};
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::sync::Mutex;
use tracing::info;

use crate::{
    api, config,
    error::{Error, Result},
    management::LedgerStore,
    types::{PkceToken, Token},
};

/// State shared by all routes.
#[derive(Clone)]
pub struct AppState {
    /// PKCE verifier of the login in progress and, once the callback ran, its token.
    pub pkce: Arc<Mutex<Option<PkceToken>>>,
    pub store: Arc<dyn LedgerStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            pkce: Arc::new(Mutex::new(None)),
            store,
        }
    }

    /// Remembers the verifier of a new login and forgets any earlier token.
    pub async fn begin_login(&self, code_verifier: String) {
        *self.pkce.lock().await = Some(PkceToken {
            code_verifier,
            token: None,
        });
    }

    /// Verifier of the login in progress. The lock is released on return.
    pub async fn pending_verifier(&self) -> Option<String> {
        self.pkce
            .lock()
            .await
            .as_ref()
            .map(|pkce| pkce.code_verifier.clone())
    }

    /// Hands the token to whoever waits for the login to finish.
    pub async fn complete_login(&self, code_verifier: String, token: Token) {
        let mut lock = self.pkce.lock().await;
        match lock.as_mut() {
            Some(pkce) => pkce.token = Some(token),
            None => {
                *lock = Some(PkceToken {
                    code_verifier,
                    token: Some(token),
                })
            }
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::index))
        .route("/health", get(api::health))
        .route("/login", get(api::login))
        .route("/callback", get(api::callback))
        .route("/logout", get(api::logout))
        .route("/playlists", get(api::playlists))
        .route("/tracking", post(api::tracking))
        .route("/history", get(api::history))
        .route("/history/sync", post(api::sync))
        .route("/shuffle", post(api::shuffle))
        .layer(Extension(state))
}

pub async fn start_api_server(state: AppState) -> Result<()> {
    let addr = SocketAddr::from_str(&config::server_addr()?)
        .map_err(|e| Error::Config(format!("Failed to parse server address: {e}")))?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
