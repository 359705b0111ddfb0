//! Navigation guard and the navigator that applies it.
//!
//! SYSTEM CONTEXT
//! ==============
//! The guard is a convenience redirect, not a security boundary: it only
//! checks for a token, never roles. Admin pages rely on the backend refusing
//! non-admin tokens.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{RouteMatch, RouteTable};
use crate::config::LOGIN_ROUTE;
use crate::state::session::Session;

const MAX_REDIRECTS: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(&'static str),
}

/// Whether navigating to `target` must bounce to the login page.
#[must_use]
pub fn should_redirect_unauth(target: &RouteMatch, has_token: bool) -> bool {
    target.requires_auth() && !has_token
}

/// Evaluate the guard for `target` against the current session.
#[must_use]
pub fn guard(target: &RouteMatch, session: &Session) -> GuardDecision {
    if should_redirect_unauth(target, session.is_logged_in()) {
        GuardDecision::Redirect(LOGIN_ROUTE)
    } else {
        GuardDecision::Proceed
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("no route matches {0}")]
    NotFound(String),
    #[error("too many redirects while navigating to {0}")]
    RedirectLoop(String),
}

/// Where navigation landed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub title: Option<&'static str>,
    pub params: BTreeMap<String, String>,
    /// Originally requested path when a redirect or the guard changed the target.
    pub redirected_from: Option<String>,
    /// The auth guard bounced this navigation to the login page.
    pub guarded: bool,
}

/// Current location plus history, with the guard applied on every move.
#[derive(Debug)]
pub struct Navigator {
    table: RouteTable,
    session: Arc<Session>,
    current: Option<Location>,
    history: Vec<String>,
}

impl Navigator {
    #[must_use]
    pub fn new(table: RouteTable, session: Arc<Session>) -> Self {
        Self { table, session, current: None, history: Vec::new() }
    }

    #[must_use]
    pub fn current(&self) -> Option<&Location> {
        self.current.as_ref()
    }

    /// Every committed location, oldest first.
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Navigate to `to`, following redirect records and the auth guard.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no route matches, or `RedirectLoop` if redirects do not settle.
    pub fn navigate(&mut self, to: &str) -> Result<Location, NavigationError> {
        let mut target = to.to_owned();
        let mut redirected_from: Option<String> = None;
        let mut guarded = false;

        for _ in 0..MAX_REDIRECTS {
            let matched = self
                .table
                .resolve(&target)
                .ok_or_else(|| NavigationError::NotFound(target.clone()))?;

            if let Some(next) = matched.redirect() {
                redirected_from.get_or_insert_with(|| matched.location());
                target = next.to_owned();
                continue;
            }

            match guard(&matched, &self.session) {
                GuardDecision::Redirect(login) => {
                    tracing::debug!(from = %matched.path, to = login, "guard redirect");
                    redirected_from.get_or_insert_with(|| matched.location());
                    guarded = true;
                    target = login.to_owned();
                }
                GuardDecision::Proceed => {
                    let location = Location {
                        path: matched.location(),
                        title: matched.title(),
                        params: matched.params.clone(),
                        redirected_from,
                        guarded,
                    };
                    self.commit(location.clone());
                    return Ok(location);
                }
            }
        }
        Err(NavigationError::RedirectLoop(to.to_owned()))
    }

    /// Hard move to the login page, bypassing redirects. Returns `false` if already there.
    pub fn force_login(&mut self) -> bool {
        let on_login = self
            .current
            .as_ref()
            .and_then(|l| self.table.resolve(&l.path))
            .is_some_and(|m| m.path == LOGIN_ROUTE);
        if on_login {
            return false;
        }
        let title = self.table.resolve(LOGIN_ROUTE).and_then(|m| m.title());
        let redirected_from = self.current.as_ref().map(|l| l.path.clone());
        self.commit(Location {
            path: LOGIN_ROUTE.to_owned(),
            title,
            params: BTreeMap::new(),
            redirected_from,
            guarded: false,
        });
        true
    }

    fn commit(&mut self, location: Location) {
        tracing::debug!(path = %location.path, "navigated");
        self.history.push(location.path.clone());
        self.current = Some(location);
    }
}
