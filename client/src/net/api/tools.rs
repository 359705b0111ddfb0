//! Utility tool endpoints: AI chat proxy and network diagnostics.
//!
//! The AI chat path contains `sparkai`, which routes it onto the executor's
//! long timeout.

#[cfg(test)]
#[path = "tools_test.rs"]
mod tools_test;

use crate::net::request::{ApiClient, Envelope, FormPart, RequestSpec};
use crate::net::types::ChatRequest;

pub const SPARK_CHAT_PATH: &str = "/api/sparkai";

/// `POST /api/sparkai`
pub async fn spark_chat(client: &ApiClient, req: &ChatRequest) -> Envelope {
    client.execute(RequestSpec::post(SPARK_CHAT_PATH).json(req)).await
}

/// `GET /api/proxy` fetches `url` server-side and reports status, headers and timing.
pub async fn proxy(client: &ApiClient, url: &str, method: &str) -> Envelope {
    let pairs = vec![("url".to_owned(), url.to_owned()), ("method".to_owned(), method.to_owned())];
    client.execute(RequestSpec::get("/api/proxy").query(pairs)).await
}

/// `GET /api/public-ip`
pub async fn public_ip(client: &ApiClient) -> Envelope {
    client.execute(RequestSpec::get("/api/public-ip")).await
}

/// `GET /api/dns-info`
pub async fn dns_info(client: &ApiClient, domain: &str) -> Envelope {
    client
        .execute(RequestSpec::get("/api/dns-info").query(vec![("domain".to_owned(), domain.to_owned())]))
        .await
}

/// `GET /api/port-test`
pub async fn port_test(client: &ApiClient, host: &str, port: u16) -> Envelope {
    let pairs = vec![("host".to_owned(), host.to_owned()), ("port".to_owned(), port.to_string())];
    client.execute(RequestSpec::get("/api/port-test").query(pairs)).await
}

/// `GET /api/speedtest/download`. `body_len` and `elapsed` on the envelope give the throughput.
pub async fn speedtest_download(client: &ApiClient, size: u64) -> Envelope {
    client
        .execute(RequestSpec::get("/api/speedtest/download").query(vec![("size".to_owned(), size.to_string())]))
        .await
}

/// `POST /api/speedtest/upload` with `bytes` as the `file` part.
pub async fn speedtest_upload(client: &ApiClient, bytes: Vec<u8>) -> Envelope {
    let parts = vec![FormPart::file("file", "upload.bin", bytes, Some("application/octet-stream"))];
    client.execute(RequestSpec::post("/api/speedtest/upload").multipart(parts)).await
}
