//! Login, logout and profile refresh on top of the session store.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every token change goes through `set_token` here so that exactly one
//! profile fetch is scheduled per token. The fetch is a spawned task tagged
//! with the token's generation; `Session::apply_profile` drops its result if
//! the user logged out or switched accounts in the meantime.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use tokio::task::JoinHandle;

use crate::net::api::user;
use crate::net::error::ApiError;
use crate::net::request::ApiClient;
use crate::net::types::{LoginRequest, UserInfo};

/// Outcome of one profile fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProfileFetch {
    /// Profile stored for the current generation.
    Loaded(UserInfo),
    /// Fetch failed; the profile was cleared and the token kept.
    Failed(String),
    /// The session moved on while the fetch was in flight; nothing was written.
    Stale,
    /// No token was present, so the profile was cleared without a request.
    Skipped,
}

/// Store `token` and schedule the matching profile fetch.
pub fn set_token(client: &ApiClient, token: &str) -> JoinHandle<ProfileFetch> {
    let generation = client.session().set_token(token);
    let client = client.clone();
    tokio::spawn(async move { fetch_profile(&client, generation).await })
}

/// Fetch `/api/user/info` and apply it to the session at `generation`.
pub async fn fetch_profile(client: &ApiClient, generation: u64) -> ProfileFetch {
    let session = client.session();
    if !session.is_logged_in() {
        session.apply_profile(generation, None);
        return ProfileFetch::Skipped;
    }

    let envelope = user::info(client).await;
    match envelope.json::<UserInfo>() {
        Ok(profile) => {
            if session.apply_profile(generation, Some(profile.clone())) {
                tracing::info!(username = profile.username.as_deref().unwrap_or_default(), "profile loaded");
                ProfileFetch::Loaded(profile)
            } else {
                ProfileFetch::Stale
            }
        }
        Err(e) => {
            if session.apply_profile(generation, None) {
                tracing::warn!(error = %e, "profile fetch failed");
                ProfileFetch::Failed(e.to_string())
            } else {
                ProfileFetch::Stale
            }
        }
    }
}

/// Re-fetch the profile for the current token.
pub async fn refresh_profile(client: &ApiClient) -> ProfileFetch {
    let generation = client.session().generation();
    fetch_profile(client, generation).await
}

/// Log in and wait for the follow-up profile fetch.
///
/// # Errors
///
/// Returns the backend's failure (for example bad credentials), or
/// `ApiError::Unexpected` if the response carries no token.
pub async fn login(client: &ApiClient, req: &LoginRequest) -> Result<ProfileFetch, ApiError> {
    let envelope = user::login(client, req).await;
    let token = envelope.text()?.trim().to_owned();
    if token.is_empty() {
        return Err(ApiError::Unexpected("login response carried no token".to_owned()));
    }
    set_token(client, &token)
        .await
        .map_err(|e| ApiError::Unexpected(format!("profile fetch task failed: {e}")))
}

/// Drop the local session. The backend keeps no server-side session to revoke.
pub fn logout(client: &ApiClient) {
    client.session().logout();
}
