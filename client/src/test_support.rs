//! In-process mock backend for HTTP-level tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};

use crate::config::ClientConfig;
use crate::events::EventBus;
use crate::net::request::ApiClient;
use crate::state::session::Session;
use crate::state::storage::MemoryStorage;

#[derive(Clone, Debug)]
pub struct Captured {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Captured {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Clone)]
struct Canned {
    status: u16,
    body: String,
    delay: Option<Duration>,
}

#[derive(Clone, Default)]
struct Shared {
    log: Arc<Mutex<Vec<Captured>>>,
    routes: Arc<Mutex<HashMap<(String, String), Canned>>>,
}

pub struct MockBackend {
    pub base_url: String,
    shared: Shared,
}

impl MockBackend {
    pub async fn start() -> Self {
        let shared = Shared::default();
        let app = Router::new().fallback(handle).with_state(shared.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { base_url: format!("http://{addr}"), shared }
    }

    pub fn respond(&self, method: &str, path: &str, status: u16, body: &str) {
        self.insert(method, path, Canned { status, body: body.to_owned(), delay: None });
    }

    pub fn respond_slow(&self, method: &str, path: &str, status: u16, body: &str, delay: Duration) {
        self.insert(method, path, Canned { status, body: body.to_owned(), delay: Some(delay) });
    }

    fn insert(&self, method: &str, path: &str, canned: Canned) {
        self.shared
            .routes
            .lock()
            .unwrap()
            .insert((method.to_owned(), path.to_owned()), canned);
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.shared.log.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn last(&self, method: &str, path: &str) -> Captured {
        self.requests()
            .into_iter()
            .rev()
            .find(|r| r.method == method && r.path == path)
            .unwrap()
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::with_base_url(&self.base_url, "/unused/session.json").unwrap()
    }

    /// Fresh session + client against this backend.
    pub fn client(&self) -> (ApiClient, Arc<Session>, EventBus) {
        let session = Arc::new(Session::restore(Arc::new(MemoryStorage::new())));
        let events = EventBus::new();
        let client = ApiClient::new(&self.config(), session.clone(), events.clone()).unwrap();
        (client, session, events)
    }
}

async fn handle(State(shared): State<Shared>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let header_str = |name: header::HeaderName| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned);
    shared.log.lock().unwrap().push(Captured {
        method: method.to_string(),
        path: uri.path().to_owned(),
        query: uri.query().map(str::to_owned),
        authorization: header_str(header::AUTHORIZATION),
        content_type: header_str(header::CONTENT_TYPE),
        body: body.to_vec(),
    });

    let canned = shared
        .routes
        .lock()
        .unwrap()
        .get(&(method.to_string(), uri.path().to_owned()))
        .cloned();
    let Some(canned) = canned else {
        return (StatusCode::NOT_FOUND, "no route").into_response();
    };
    if let Some(delay) = canned.delay {
        tokio::time::sleep(delay).await;
    }
    let content_type = if canned.body.starts_with('{') || canned.body.starts_with('[') {
        "application/json"
    } else {
        "text/plain;charset=UTF-8"
    };
    let status = StatusCode::from_u16(canned.status).unwrap();
    (status, [(header::CONTENT_TYPE, content_type)], canned.body).into_response()
}
