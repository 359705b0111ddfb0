//! Top-level coordinator wiring session, transport and navigation.
//!
//! ARCHITECTURE
//! ============
//! `App::start` builds the one `Session`, the `EventBus`, the `ApiClient` and
//! the `Navigator`, then spawns an event loop. The transport only publishes
//! events; this loop is the single place that reacts to them:
//!
//! - `Unauthorized` expires the session for the generation that failed and
//!   forces the login page. Concurrent 401s for one session clear it once.
//! - `RequestFailed` is forwarded to the `Notifier`, one notice per failure.

#[cfg(test)]
#[path = "app_test.rs"]
mod app_test;

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::events::{ClientEvent, EventBus};
use crate::net::error::ApiError;
use crate::net::request::ApiClient;
use crate::router::RouteTable;
use crate::router::guard::{Location, NavigationError, Navigator};
use crate::state::session::Session;
use crate::state::storage::SessionStorage;

/// Sink for user-facing error notices.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Reacts to client events. Holds no sender, so the event loop ends once
/// every `ApiClient` clone is dropped.
struct Coordinator {
    session: Arc<Session>,
    navigator: Arc<Mutex<Navigator>>,
    notifier: Arc<dyn Notifier>,
}

impl Coordinator {
    fn handle(&self, event: &ClientEvent) {
        match event {
            ClientEvent::Unauthorized { generation, path } => {
                let expired = self.session.expire(*generation);
                if expired || !self.session.is_logged_in() {
                    let moved = lock_navigator(&self.navigator).force_login();
                    tracing::info!(%path, expired, moved, "authentication required");
                }
            }
            ClientEvent::RequestFailed { message, .. } => self.notifier.notify(message),
        }
    }

    async fn run(self, mut rx: broadcast::Receiver<ClientEvent>) {
        loop {
            match rx.recv().await {
                Ok(event) => self.handle(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "client event loop lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        tracing::debug!("client event loop stopped");
    }
}

fn lock_navigator(navigator: &Mutex<Navigator>) -> MutexGuard<'_, Navigator> {
    navigator.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

pub struct App {
    config: ClientConfig,
    session: Arc<Session>,
    client: ApiClient,
    navigator: Arc<Mutex<Navigator>>,
    event_loop: JoinHandle<()>,
}

impl App {
    /// Restore the session from `storage` and start the event loop.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn start(
        config: ClientConfig,
        storage: Arc<dyn SessionStorage>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ApiError> {
        let session = Arc::new(Session::restore(storage));
        let events = EventBus::new();
        let rx = events.subscribe();
        let client = ApiClient::new(&config, session.clone(), events)?;
        let navigator = Arc::new(Mutex::new(Navigator::new(RouteTable::default(), session.clone())));

        let coordinator = Coordinator { session: session.clone(), navigator: navigator.clone(), notifier };
        let event_loop = tokio::spawn(coordinator.run(rx));

        tracing::info!(base_url = %config.base_url, logged_in = session.is_logged_in(), "client started");
        Ok(Self { config, session, client, navigator, event_loop })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Navigate through the guard.
    ///
    /// # Errors
    ///
    /// See `Navigator::navigate`.
    pub fn navigate(&self, to: &str) -> Result<Location, NavigationError> {
        lock_navigator(&self.navigator).navigate(to)
    }

    #[must_use]
    pub fn location(&self) -> Option<Location> {
        lock_navigator(&self.navigator).current().cloned()
    }

    #[must_use]
    pub fn history(&self) -> Vec<String> {
        lock_navigator(&self.navigator).history().to_vec()
    }

    /// Drop the transport and wait until every event already published has
    /// been handled. Clones of the client held elsewhere keep the loop alive.
    pub async fn shutdown(self) {
        let Self { client, event_loop, .. } = self;
        drop(client);
        if let Err(e) = event_loop.await {
            tracing::warn!(error = %e, "client event loop ended abnormally");
        }
    }
}
