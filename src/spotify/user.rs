use crate::{error::Result, types::CurrentUserResponse};

use super::SpotifyClient;

/// Retrieves the profile of the account the token belongs to.
///
/// The service layer uses the returned id to find the registered user in the
/// ledger store; the login callback uses it to register the account.
///
/// # Returns
///
/// - `Ok(CurrentUserResponse)` - Spotify user id and display name (the
///   latter may be missing)
/// - `Err(Error::AuthExpired)` / `Err(Error::Upstream)` - as for any request
///
/// # API Endpoint
///
/// `GET /me`
pub async fn current_user(client: &SpotifyClient) -> Result<CurrentUserResponse> {
    let api_url = client.url("/me");
    let response = client
        .send(|http, token| http.get(&api_url).bearer_auth(token))
        .await?;
    Ok(response.json::<CurrentUserResponse>().await?)
}
