//! Networking: the shared request executor, typed endpoint wrappers and DTOs.
//!
//! SYSTEM CONTEXT
//! ==============
//! `request` owns the HTTP client and result envelope, `api` maps endpoints to
//! request specs, `types` defines the backend schema and `error` the failure taxonomy.

pub mod api;
pub mod error;
pub mod request;
pub mod types;
