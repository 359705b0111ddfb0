//! Typed wrappers around backend endpoints.
//!
//! SYSTEM CONTEXT
//! ==============
//! One function per endpoint. Each only shapes path, method, query and body
//! and hands the `RequestSpec` to `ApiClient::execute`; none validate, retry or cache.
//! Callers get the raw `Envelope` back and decide what to render.

pub mod article;
pub mod tools;
pub mod user;
