//! Session store: current token and cached user profile.
//!
//! SYSTEM CONTEXT
//! ==============
//! One `Session` is created at startup and shared (`Arc`) with the request
//! executor, the auth flow and the navigator. Every mutation is written to
//! `SessionStorage` before the lock is released, so a fresh `restore` always
//! reflects the last completed call.
//!
//! GENERATIONS
//! ===========
//! Each token change bumps `generation`. Profile fetches and 401 reactions
//! carry the generation they started under and are ignored once it moved on,
//! so a slow response cannot resurrect a session that was already cleared.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::{Arc, Mutex, MutexGuard};

use super::storage::{SessionStorage, TOKEN_KEY, USER_INFO_KEY, load_json, save_json};
use crate::net::types::UserInfo;

/// Point-in-time copy of the session, for rendering.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub token: Option<String>,
    pub profile: Option<UserInfo>,
    pub generation: u64,
}

impl SessionSnapshot {
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.profile.as_ref().is_some_and(UserInfo::is_admin)
    }
}

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    profile: Option<UserInfo>,
    generation: u64,
}

pub struct Session {
    storage: Arc<dyn SessionStorage>,
    state: Mutex<SessionState>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Session")
            .field("logged_in", &state.token.is_some())
            .field("generation", &state.generation)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Rebuild the session from durable storage.
    ///
    /// A stored profile without a token is an orphan from an interrupted
    /// logout and is removed, as is a profile entry that no longer parses.
    #[must_use]
    pub fn restore(storage: Arc<dyn SessionStorage>) -> Self {
        let token = storage.get_item(TOKEN_KEY).filter(|t| !t.is_empty());
        let profile = if token.is_some() { load_json::<UserInfo>(storage.as_ref(), USER_INFO_KEY) } else { None };
        if profile.is_none() && storage.get_item(USER_INFO_KEY).is_some() {
            if let Err(e) = storage.remove_item(USER_INFO_KEY) {
                tracing::warn!(error = %e, "failed to drop unusable stored profile");
            }
        }
        tracing::debug!(logged_in = token.is_some(), has_profile = profile.is_some(), "session restored");
        Self { storage, state: Mutex::new(SessionState { token, profile, generation: 0 }) }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.lock().token.clone()
    }

    #[must_use]
    pub fn profile(&self) -> Option<UserInfo> {
        self.lock().profile.clone()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Token plus the generation it belongs to, read under one lock.
    #[must_use]
    pub fn bearer(&self) -> Option<(String, u64)> {
        let state = self.lock();
        state.token.clone().map(|token| (token, state.generation))
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot { token: state.token.clone(), profile: state.profile.clone(), generation: state.generation }
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.lock().token.is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.lock().profile.as_ref().is_some_and(UserInfo::is_admin)
    }

    /// Store a new token and return its generation.
    ///
    /// The previous profile is dropped; the caller is expected to fetch the
    /// new one (see `state::auth::set_token`). An empty token logs out.
    pub fn set_token(&self, token: &str) -> u64 {
        if token.is_empty() {
            self.logout();
            return self.generation();
        }
        let mut state = self.lock();
        state.token = Some(token.to_owned());
        state.profile = None;
        state.generation += 1;
        self.persist_token(Some(token));
        self.persist_profile(None);
        tracing::info!(generation = state.generation, "session token set");
        state.generation
    }

    /// Apply the outcome of a profile fetch started under `generation`.
    ///
    /// `Some` replaces the cached profile wholesale, `None` clears it. Returns
    /// `false` (and changes nothing) when the session has moved on or holds no token.
    pub fn apply_profile(&self, generation: u64, profile: Option<UserInfo>) -> bool {
        let mut state = self.lock();
        if state.generation != generation || state.token.is_none() {
            tracing::debug!(generation, current = state.generation, "ignoring stale profile result");
            return false;
        }
        self.persist_profile(profile.as_ref());
        state.profile = profile;
        true
    }

    /// Clear token and profile.
    pub fn logout(&self) {
        let mut state = self.lock();
        self.clear_locked(&mut state);
        tracing::info!(generation = state.generation, "session cleared");
    }

    /// Clear the session only if it is still the one at `generation`.
    ///
    /// Returns whether this call performed the transition, so concurrent
    /// authentication failures for the same session clear it exactly once.
    pub fn expire(&self, generation: u64) -> bool {
        let mut state = self.lock();
        if state.generation != generation || state.token.is_none() {
            return false;
        }
        self.clear_locked(&mut state);
        tracing::info!(generation = state.generation, "session expired");
        true
    }

    fn clear_locked(&self, state: &mut SessionState) {
        state.token = None;
        state.profile = None;
        state.generation += 1;
        self.persist_token(None);
        self.persist_profile(None);
    }

    fn persist_token(&self, token: Option<&str>) {
        let result = match token {
            Some(token) => self.storage.set_item(TOKEN_KEY, token),
            None => self.storage.remove_item(TOKEN_KEY),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to persist session token");
        }
    }

    fn persist_profile(&self, profile: Option<&UserInfo>) {
        let result = match profile {
            Some(profile) => save_json(self.storage.as_ref(), USER_INFO_KEY, profile),
            None => self.storage.remove_item(USER_INFO_KEY),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to persist user profile");
        }
    }
}
