use std::time::Duration;

use super::*;
use crate::net::error::DEFAULT_ERROR_MESSAGE;
use crate::state::storage::MemoryStorage;
use crate::test_support::MockBackend;

// =============================================================
// Pure helpers
// =============================================================

#[test]
fn api_prefix_detection() {
    assert!(is_api_path("/api/article/list"));
    assert!(!is_api_path("/apix"));
    assert!(!is_api_path("/biyingapi/hslt/list"));
    assert!(!is_api_path("https://example.test/api/x"));
}

#[test]
fn ai_paths_get_the_long_timeout() {
    let timeouts = Timeouts { request: Duration::from_secs(1), ai: Duration::from_secs(9), connect: Duration::from_secs(1) };
    assert_eq!(timeout_for("/api/sparkai", &timeouts), Duration::from_secs(9));
    assert_eq!(timeout_for("/api/article/list", &timeouts), Duration::from_secs(1));
}

#[test]
fn resolve_url_joins_relative_and_keeps_absolute() {
    assert_eq!(resolve_url("http://h:1", "/api/x"), "http://h:1/api/x");
    assert_eq!(resolve_url("http://h:1", "api/x"), "http://h:1/api/x");
    assert_eq!(resolve_url("http://h:1", "https://other.test/y"), "https://other.test/y");
}

#[test]
fn decode_body_prefers_json_then_text() {
    assert_eq!(decode_body(b""), Value::Null);
    assert_eq!(decode_body(br#"{"a":1}"#), serde_json::json!({ "a": 1 }));
    assert_eq!(decode_body(b"eyJhbGciOi.token"), Value::String("eyJhbGciOi.token".to_owned()));
}

#[test]
fn error_message_prefers_backend_message_field() {
    assert_eq!(error_message(&serde_json::json!({ "message": "title required" })), "title required");
    assert_eq!(error_message(&Value::String("bad password".to_owned())), "bad password");
    assert_eq!(error_message(&Value::Null), DEFAULT_ERROR_MESSAGE);
    assert_eq!(error_message(&serde_json::json!({ "error": "x" })), r#"{"error":"x"}"#);
}

#[test]
fn json_builder_captures_encode_failures() {
    let mut map = std::collections::HashMap::new();
    map.insert(vec![1u8], "non-string key");
    let spec = RequestSpec::post("/api/x").json(&map);
    assert!(matches!(spec.body, RequestBody::Invalid(_)));
}

// =============================================================
// Against the mock backend
// =============================================================

#[tokio::test]
async fn api_call_carries_bearer_when_token_present() {
    let backend = MockBackend::start().await;
    backend.respond("GET", "/api/user/info", 200, r#"{"username":"ann"}"#);
    let (client, session, _) = backend.client();
    session.set_token("tok-1");

    let env = client.execute(RequestSpec::get("/api/user/info")).await;

    assert!(env.ok);
    assert_eq!(env.status, 200);
    assert_eq!(env.data["username"], "ann");
    assert!(env.error.is_none());
    assert_eq!(backend.last("GET", "/api/user/info").authorization.as_deref(), Some("Bearer tok-1"));
}

#[tokio::test]
async fn api_call_without_token_sends_no_authorization() {
    let backend = MockBackend::start().await;
    backend.respond("GET", "/api/article/list", 200, "[]");
    let (client, _, _) = backend.client();

    client.execute(RequestSpec::get("/api/article/list")).await;

    assert!(backend.last("GET", "/api/article/list").authorization.is_none());
}

#[tokio::test]
async fn non_api_path_never_carries_token() {
    let backend = MockBackend::start().await;
    backend.respond("GET", "/juheapi/weather", 200, "{}");
    let (client, session, _) = backend.client();
    session.set_token("tok-1");

    client.execute(RequestSpec::get("/juheapi/weather")).await;

    assert!(backend.last("GET", "/juheapi/weather").authorization.is_none());
}

#[tokio::test]
async fn plain_text_body_is_kept_as_string() {
    let backend = MockBackend::start().await;
    backend.respond("POST", "/api/user/login", 200, "jwt-token-value");
    let (client, _, _) = backend.client();

    let env = client
        .execute(RequestSpec::post("/api/user/login").json(&serde_json::json!({ "username": "a", "password": "b" })))
        .await;

    assert_eq!(env.text().unwrap(), "jwt-token-value");
    let sent = backend.last("POST", "/api/user/login");
    assert_eq!(sent.content_type.as_deref(), Some("application/json"));
    assert_eq!(serde_json::from_slice::<Value>(&sent.body).unwrap()["username"], "a");
}

#[tokio::test]
async fn http_error_uses_backend_message_and_notifies() {
    let backend = MockBackend::start().await;
    backend.respond("POST", "/api/article/create", 400, r#"{"message":"title required"}"#);
    let (client, _, events) = backend.client();
    let mut rx = events.subscribe();

    let env = client.execute(RequestSpec::post("/api/article/create")).await;

    assert!(!env.ok);
    assert_eq!(env.status, 400);
    assert_eq!(env.status_text, "Bad Request");
    assert_eq!(env.data, Value::Null);
    assert_eq!(env.error, Some(RequestError::Http { status: 400, message: "title required".to_owned() }));
    assert_eq!(
        rx.recv().await.unwrap(),
        ClientEvent::RequestFailed {
            path: "/api/article/create".to_owned(),
            status: 400,
            message: "title required".to_owned()
        }
    );
}

#[tokio::test]
async fn http_error_with_text_body_shows_it_verbatim() {
    let backend = MockBackend::start().await;
    backend.respond("POST", "/api/user/login", 400, "wrong username or password");
    let (client, _, _) = backend.client();

    let env = client.execute(RequestSpec::post("/api/user/login")).await;

    assert_eq!(env.error.unwrap().to_string(), "wrong username or password");
}

#[tokio::test]
async fn unauthorized_emits_event_with_sending_generation() {
    let backend = MockBackend::start().await;
    backend.respond("GET", "/api/article/my", 401, "not logged in");
    let (client, session, events) = backend.client();
    let generation = session.set_token("expired");
    let mut rx = events.subscribe();

    let env = client.execute(RequestSpec::get("/api/article/my")).await;

    assert!(env.error.as_ref().unwrap().is_unauthorized());
    assert_eq!(
        rx.recv().await.unwrap(),
        ClientEvent::Unauthorized { generation, path: "/api/article/my".to_owned() }
    );
    assert!(matches!(rx.recv().await.unwrap(), ClientEvent::RequestFailed { status: 401, .. }));
    // The executor reports; it does not clear the session itself.
    assert!(session.is_logged_in());
}

#[tokio::test]
async fn network_failure_is_captured_with_status_zero() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ClientConfig::with_base_url(&format!("http://{addr}"), "/unused").unwrap();
    let session = Arc::new(Session::restore(Arc::new(MemoryStorage::new())));
    let events = EventBus::new();
    let mut rx = events.subscribe();
    let client = ApiClient::new(&config, session, events).unwrap();

    let env = client.execute(RequestSpec::get("/api/article/list")).await;

    assert!(!env.ok);
    assert_eq!(env.status, 0);
    assert!(matches!(env.error, Some(RequestError::Network(_))));
    assert!(!env.status_text.is_empty());
    assert!(matches!(rx.recv().await.unwrap(), ClientEvent::RequestFailed { status: 0, .. }));
}

#[tokio::test]
async fn normal_calls_time_out_but_ai_calls_get_longer() {
    let backend = MockBackend::start().await;
    backend.respond_slow("GET", "/api/public-ip", 200, r#"{"ip":"1.2.3.4"}"#, Duration::from_millis(400));
    backend.respond_slow("POST", "/api/sparkai", 200, r#"{"choices":[]}"#, Duration::from_millis(400));

    let mut config = backend.config();
    config.timeouts.request = Duration::from_millis(100);
    config.timeouts.ai = Duration::from_secs(5);
    let session = Arc::new(Session::restore(Arc::new(MemoryStorage::new())));
    let client = ApiClient::new(&config, session, EventBus::new()).unwrap();

    let slow = client.execute(RequestSpec::get("/api/public-ip")).await;
    assert_eq!(slow.error, Some(RequestError::Timeout));
    assert_eq!(slow.status, 0);

    let ai = client.execute(RequestSpec::post("/api/sparkai")).await;
    assert!(ai.ok);
}

#[tokio::test]
async fn query_pairs_are_encoded() {
    let backend = MockBackend::start().await;
    backend.respond("GET", "/api/dns-info", 200, "{}");
    let (client, _, _) = backend.client();

    client
        .execute(RequestSpec::get("/api/dns-info").query(vec![("domain".to_owned(), "a b.test".to_owned())]))
        .await;

    assert_eq!(backend.last("GET", "/api/dns-info").query.as_deref(), Some("domain=a+b.test"));
}

#[tokio::test]
async fn multipart_body_carries_file_and_fields() {
    let backend = MockBackend::start().await;
    backend.respond("POST", "/api/upload/image", 200, r#"{"url":"/img/1.png"}"#);
    let (client, session, _) = backend.client();
    session.set_token("tok");

    let parts = vec![
        FormPart::file("file", "cover.png", b"PNGDATA".to_vec(), Some("image/png")),
        FormPart::text("type", "cover"),
    ];
    let env = client.execute(RequestSpec::post("/api/upload/image").multipart(parts)).await;

    assert!(env.ok);
    let sent = backend.last("POST", "/api/upload/image");
    assert!(sent.content_type.as_deref().unwrap().starts_with("multipart/form-data"));
    let body = sent.body_text();
    assert!(body.contains(r#"name="file"; filename="cover.png""#));
    assert!(body.contains("PNGDATA"));
    assert!(body.contains(r#"name="type""#));
    assert_eq!(sent.authorization.as_deref(), Some("Bearer tok"));
}

#[tokio::test]
async fn invalid_mime_is_reported_without_sending() {
    let backend = MockBackend::start().await;
    let (client, _, _) = backend.client();

    let parts = vec![FormPart::file("file", "x", vec![1], Some("not a mime"))];
    let env = client.execute(RequestSpec::post("/api/upload/image").multipart(parts)).await;

    assert!(matches!(env.error, Some(RequestError::Encode(_))));
    assert_eq!(backend.count("POST", "/api/upload/image"), 0);
}

#[tokio::test]
async fn extra_headers_are_forwarded() {
    let backend = MockBackend::start().await;
    backend.respond("GET", "/api/article/list", 200, "{}");
    let (client, _, _) = backend.client();

    let env = client
        .execute(RequestSpec::get("/api/article/list").header("Content-Type", "application/json"))
        .await;

    assert!(env.ok);
    assert_eq!(backend.last("GET", "/api/article/list").content_type.as_deref(), Some("application/json"));
}
