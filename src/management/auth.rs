use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, warn};

use crate::{
    config,
    error::{Error, Result},
    spotify,
    types::Token,
};

/// Seconds before the real expiry at which a token is already treated as stale.
const EXPIRY_MARGIN_SECS: u64 = 240;

pub struct TokenManager {
    token: Token,
}

impl TokenManager {
    pub fn new(token: Token) -> Self {
        TokenManager { token }
    }

    /// Reads the cached credential. A missing or unreadable cache means the
    /// user has to authorize again.
    pub async fn load() -> Result<Self> {
        let path = Self::token_path();
        let content = async_fs::read_to_string(&path).await.map_err(|e| {
            debug!("No token cache at {}: {}", path.display(), e);
            Error::AuthExpired
        })?;
        let token: Token = serde_json::from_str(&content)?;
        Ok(Self { token })
    }

    pub async fn persist(&self) -> Result<()> {
        let path = Self::token_path();
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(&self.token)?;
        async_fs::write(path, json).await?;
        Ok(())
    }

    /// Forgets the cached credential.
    pub async fn clear() -> Result<()> {
        match async_fs::remove_file(Self::token_path()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Access token usable right now, refreshed (and re-cached) when stale.
    pub async fn get_valid_token(&mut self) -> Result<String> {
        if !self.is_valid() {
            let new_token = spotify::auth::refresh_token(&self.token.refresh_token)
                .await
                .map_err(|e| {
                    warn!("Token refresh failed: {}", e);
                    Error::AuthExpired
                })?;
            self.token = new_token;
            self.persist().await?;
        }

        Ok(self.token.access_token.clone())
    }

    pub fn is_valid(&self) -> bool {
        !self.token.access_token.is_empty() && !is_expired(&self.token, Utc::now().timestamp() as u64)
    }

    fn token_path() -> PathBuf {
        config::data_dir().join("cache/token.json")
    }
}

/// True once `now` is within the safety margin of the token's expiry.
pub fn is_expired(token: &Token, now: u64) -> bool {
    now + EXPIRY_MARGIN_SECS >= token.obtained_at + token.expires_in
}
