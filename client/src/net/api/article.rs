//! Article CRUD, review workflow, counters and image upload.

#[cfg(test)]
#[path = "article_test.rs"]
mod article_test;

use crate::net::request::{ApiClient, Envelope, FormPart, RequestSpec};
use crate::net::types::{
    ArticleQuery, ArticleStatus, CreateArticleRequest, ImageKind, ReviewRequest, UpdateArticleRequest, page_pairs,
};

pub(crate) fn article_endpoint(id: i64) -> String {
    format!("/api/article/{id}")
}

pub(crate) fn article_action_endpoint(id: i64, action: &str) -> String {
    format!("/api/article/{id}/{action}")
}

/// Best-effort MIME type from a file extension; `None` lets the server sniff.
pub(crate) fn image_mime(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

/// `POST /api/article/create`
pub async fn create(client: &ApiClient, req: &CreateArticleRequest) -> Envelope {
    client.execute(RequestSpec::post("/api/article/create").json(req)).await
}

/// `GET /api/article/list`
pub async fn list(client: &ApiClient, query: &ArticleQuery) -> Envelope {
    client.execute(RequestSpec::get("/api/article/list").query(query.to_pairs())).await
}

/// `GET /api/article/{id}`
pub async fn detail(client: &ApiClient, id: i64) -> Envelope {
    client.execute(RequestSpec::get(article_endpoint(id))).await
}

/// `PUT /api/article/{id}`
pub async fn update(client: &ApiClient, id: i64, req: &UpdateArticleRequest) -> Envelope {
    client.execute(RequestSpec::put(article_endpoint(id)).json(req)).await
}

/// `DELETE /api/article/{id}`
pub async fn delete(client: &ApiClient, id: i64) -> Envelope {
    client.execute(RequestSpec::delete(article_endpoint(id))).await
}

/// `POST /api/article/{id}/submit` moves a draft into review.
pub async fn submit(client: &ApiClient, id: i64) -> Envelope {
    client.execute(RequestSpec::post(article_action_endpoint(id, "submit"))).await
}

/// `GET /api/article/pending` (admin only, enforced by the backend).
pub async fn pending(client: &ApiClient, page: Option<u32>, size: Option<u32>) -> Envelope {
    client.execute(RequestSpec::get("/api/article/pending").query(page_pairs(page, size))).await
}

/// `POST /api/article/{id}/review`
pub async fn review(client: &ApiClient, id: i64, req: &ReviewRequest) -> Envelope {
    client.execute(RequestSpec::post(article_action_endpoint(id, "review")).json(req)).await
}

/// `POST /api/article/{id}/like`
pub async fn like(client: &ApiClient, id: i64) -> Envelope {
    client.execute(RequestSpec::post(article_action_endpoint(id, "like"))).await
}

/// `DELETE /api/article/{id}/like`
pub async fn unlike(client: &ApiClient, id: i64) -> Envelope {
    client.execute(RequestSpec::delete(article_action_endpoint(id, "like"))).await
}

/// `POST /api/article/{id}/view` bumps the view counter.
pub async fn view(client: &ApiClient, id: i64) -> Envelope {
    client.execute(RequestSpec::post(article_action_endpoint(id, "view"))).await
}

/// `POST /api/upload/image` as multipart with `file` and `type` fields.
pub async fn upload_image(client: &ApiClient, file_name: &str, bytes: Vec<u8>, kind: ImageKind) -> Envelope {
    let parts = vec![
        FormPart::file("file", file_name, bytes, image_mime(file_name)),
        FormPart::text("type", kind.as_str()),
    ];
    client.execute(RequestSpec::post("/api/upload/image").multipart(parts)).await
}

/// `GET /api/article/my`
pub async fn my_articles(
    client: &ApiClient,
    page: Option<u32>,
    size: Option<u32>,
    status: Option<ArticleStatus>,
) -> Envelope {
    let mut pairs = page_pairs(page, size);
    if let Some(status) = status {
        pairs.push(("status".to_owned(), status.as_str().to_owned()));
    }
    client.execute(RequestSpec::get("/api/article/my").query(pairs)).await
}
