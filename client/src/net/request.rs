//! Shared request executor for every backend call.
//!
//! DESIGN
//! ======
//! `ApiClient::execute` is the single path to the network. It decides the
//! timeout, attaches the bearer token for `/api/` paths, and folds every
//! outcome (success, HTTP error, transport error) into an `Envelope`. It never
//! returns `Err` and never panics on bad input.
//!
//! The session is injected rather than looked up, so the token read here and
//! the generation stamped on a 401 event come from the same lock acquisition.

#[cfg(test)]
#[path = "request_test.rs"]
mod request_test;

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::{ApiError, RequestError, error_message};
use crate::config::{API_PREFIX, ClientConfig, Timeouts};
use crate::events::{ClientEvent, EventBus};
use crate::state::session::Session;

/// Paths containing this marker are AI chat calls and get the long timeout.
const AI_PATH_MARKER: &str = "sparkai";

// =============================================================================
// REQUEST DESCRIPTION
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File { file_name: String, bytes: Vec<u8>, mime: Option<String> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormPart {
    pub name: String,
    pub value: FormValue,
}

impl FormPart {
    #[must_use]
    pub fn text(name: &str, value: impl Into<String>) -> Self {
        Self { name: name.to_owned(), value: FormValue::Text(value.into()) }
    }

    #[must_use]
    pub fn file(name: &str, file_name: &str, bytes: Vec<u8>, mime: Option<&str>) -> Self {
        Self {
            name: name.to_owned(),
            value: FormValue::File { file_name: file_name.to_owned(), bytes, mime: mime.map(str::to_owned) },
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(Vec<FormPart>),
    /// Serialization failed while building the request; reported at execute time.
    Invalid(String),
}

/// Everything needed to perform one call.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestSpec {
    pub path: String,
    pub method: Method,
    pub body: RequestBody,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl RequestSpec {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { path: path.into(), method, body: RequestBody::Empty, query: Vec::new(), headers: Vec::new() }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        self.body = match serde_json::to_value(body) {
            Ok(value) => RequestBody::Json(value),
            Err(e) => RequestBody::Invalid(e.to_string()),
        };
        self
    }

    #[must_use]
    pub fn multipart(mut self, parts: Vec<FormPart>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }

    #[must_use]
    pub fn query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }
}

// =============================================================================
// ENVELOPE
// =============================================================================

/// Uniform outcome of a call. `error` is `None` exactly when `ok` is true.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    /// Decoded body: JSON when it parses, a JSON string otherwise, `null` when empty or on failure.
    pub data: Value,
    /// HTTP status, or 0 when no response arrived.
    pub status: u16,
    pub status_text: String,
    pub ok: bool,
    pub error: Option<RequestError>,
    /// Raw body length in bytes.
    pub body_len: usize,
    pub elapsed: Duration,
}

impl Envelope {
    fn failure(error: RequestError, status: u16, status_text: String, elapsed: Duration) -> Self {
        Self { data: Value::Null, status, status_text, ok: false, error: Some(error), body_len: 0, elapsed }
    }

    /// Decode `data` into `T`, or return the captured failure.
    ///
    /// # Errors
    ///
    /// Returns the envelope's request error, or a decode error if `data` does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        if let Some(err) = &self.error {
            return Err(ApiError::Request(err.clone()));
        }
        Ok(serde_json::from_value(self.data.clone())?)
    }

    /// Body as display text; strings come back unquoted.
    ///
    /// # Errors
    ///
    /// Returns the envelope's request error for failed calls.
    pub fn text(&self) -> Result<String, ApiError> {
        if let Some(err) = &self.error {
            return Err(ApiError::Request(err.clone()));
        }
        Ok(match &self.data {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }
}

// =============================================================================
// CLIENT
// =============================================================================

/// Cloneable handle over a shared connection pool, session and event bus.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeouts: Timeouts,
    session: Arc<Session>,
    events: EventBus,
}

impl ApiClient {
    /// Build a client for `config`, reading tokens from `session` and publishing to `events`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig, session: Arc<Session>, events: EventBus) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.timeouts.connect)
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.base_url.clone(), timeouts: config.timeouts, session, events })
    }

    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Perform one call. All failures are returned inside the envelope.
    pub async fn execute(&self, spec: RequestSpec) -> Envelope {
        let started = Instant::now();
        let RequestSpec { path, method, body, query, headers } = spec;

        // Token and generation are read together so a 401 is attributed to the
        // session that actually sent the request.
        let (bearer, generation) = if is_api_path(&path) {
            match self.session.bearer() {
                Some((token, generation)) => (Some(token), generation),
                None => (None, self.session.generation()),
            }
        } else {
            (None, self.session.generation())
        };

        let url = resolve_url(&self.base_url, &path);
        let mut builder = self
            .http
            .request(method.clone(), &url)
            .timeout(timeout_for(&path, &self.timeouts));
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = &bearer {
            builder = builder.bearer_auth(token);
        }
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(parts) => match build_form(parts) {
                Ok(form) => builder.multipart(form),
                Err(err) => return self.fail(&path, err, 0, started),
            },
            RequestBody::Invalid(reason) => return self.fail(&path, RequestError::Encode(reason), 0, started),
        };

        tracing::debug!(%method, %path, auth = bearer.is_some(), "sending request");

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return self.fail(&path, transport_error(&e), 0, started),
        };

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_owned();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return self.fail(&path, transport_error(&e), status.as_u16(), started),
        };
        let data = decode_body(&bytes);

        if status.is_success() {
            tracing::debug!(%method, %path, status = status.as_u16(), "request ok");
            return Envelope {
                data,
                status: status.as_u16(),
                status_text,
                ok: true,
                error: None,
                body_len: bytes.len(),
                elapsed: started.elapsed(),
            };
        }

        let error = RequestError::Http { status: status.as_u16(), message: error_message(&data) };
        if error.is_unauthorized() {
            tracing::info!(%path, generation, "request unauthorized");
            self.events.emit(ClientEvent::Unauthorized { generation, path: path.clone() });
        }
        let mut envelope = self.fail(&path, error, status.as_u16(), started);
        envelope.status_text = status_text;
        envelope.body_len = bytes.len();
        envelope
    }

    fn fail(&self, path: &str, error: RequestError, status: u16, started: Instant) -> Envelope {
        let message = error.to_string();
        tracing::warn!(%path, status, error = %message, "request failed");
        self.events.emit(ClientEvent::RequestFailed { path: path.to_owned(), status, message: message.clone() });
        Envelope::failure(error, status, message, started.elapsed())
    }
}

// =============================================================================
// HELPERS
// =============================================================================

pub(crate) fn is_api_path(path: &str) -> bool {
    path.starts_with(API_PREFIX)
}

pub(crate) fn timeout_for(path: &str, timeouts: &Timeouts) -> Duration {
    if path.contains(AI_PATH_MARKER) { timeouts.ai } else { timeouts.request }
}

pub(crate) fn resolve_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_owned();
    }
    if path.starts_with('/') {
        format!("{base_url}{path}")
    } else {
        format!("{base_url}/{path}")
    }
}

pub(crate) fn decode_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
        return value;
    }
    Value::String(String::from_utf8_lossy(bytes).into_owned())
}

fn transport_error(e: &reqwest::Error) -> RequestError {
    if e.is_timeout() { RequestError::Timeout } else { RequestError::Network(e.to_string()) }
}

fn build_form(parts: Vec<FormPart>) -> Result<Form, RequestError> {
    let mut form = Form::new();
    for part in parts {
        form = match part.value {
            FormValue::Text(text) => form.text(part.name, text),
            FormValue::File { file_name, bytes, mime } => {
                let mut file = Part::bytes(bytes).file_name(file_name);
                if let Some(mime) = mime {
                    file = file
                        .mime_str(&mime)
                        .map_err(|e| RequestError::Encode(e.to_string()))?;
                }
                form.part(part.name, file)
            }
        };
    }
    Ok(form)
}
