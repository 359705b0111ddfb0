//! Client-side session state.
//!
//! SYSTEM CONTEXT
//! ==============
//! `session` is the in-memory source of truth, `storage` makes it durable,
//! and `auth` sequences token changes with profile fetches.

pub mod auth;
pub mod session;
pub mod storage;
