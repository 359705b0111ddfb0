//! # client
//!
//! Client side of the Inkwell article platform: a bearer-authenticated REST
//! executor, typed endpoint wrappers, a persisted session store and a guarded
//! route table, tied together by the `app` coordinator.

pub mod app;
pub mod config;
pub mod events;
pub mod net;
pub mod router;
pub mod state;

#[cfg(test)]
mod test_support;
