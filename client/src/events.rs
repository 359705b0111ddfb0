//! Transport events published by the HTTP layer.
//!
//! SYSTEM CONTEXT
//! ==============
//! The executor never navigates or touches UI. It publishes what happened on
//! a broadcast channel and the coordinator in `app` decides what to do.

#[cfg(test)]
#[path = "events_test.rs"]
mod events_test;

use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientEvent {
    /// A call answered 401. `generation` is the session generation the call was sent under.
    Unauthorized { generation: u64, path: String },
    /// Any failed call, network- or HTTP-level. `status` is 0 when no response arrived.
    RequestFailed { path: String, status: u16, message: String },
}

#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn emit(&self, event: ClientEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("client event dropped: no subscribers");
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
