//! Backend DTOs for the article, user and tool endpoints.
//!
//! DESIGN
//! ======
//! Field names mirror the backend's camelCase JSON. Every field the backend
//! may omit is optional so a partial response still decodes.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// USER
// =============================================================================

/// Cached profile snapshot of the signed-in user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// `"ADMIN"` or `"USER"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
    /// Image URL or base64 data URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl UserInfo {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user_type.as_deref() == Some("ADMIN")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpdateAvatarRequest {
    pub avatar: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpdateUserRequest {
    pub username: String,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

// =============================================================================
// ARTICLE
// =============================================================================

/// Article lifecycle: `DRAFT` → `PENDING` → `APPROVED` | `REJECTED`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArticleStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
}

impl ArticleStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ArticleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(Self::Draft),
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(format!("unknown article status: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewAction {
    Approve,
    Reject,
}

/// Upload slot for an image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Cover,
    #[default]
    Content,
}

impl ImageKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cover => "cover",
            Self::Content => "content",
        }
    }
}

/// Inline article image as stored by the backend (base64 payload).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub author_id: Option<i64>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_avatar: Option<String>,
    #[serde(default)]
    pub status: Option<ArticleStatus>,
    #[serde(default)]
    pub view_count: i64,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub updated_at: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub published_at: Option<String>,
    #[serde(default)]
    pub review_comment: Option<String>,
    #[serde(default)]
    pub images: Vec<ArticleImage>,
    /// Whether the current user has liked this article, when the backend reports it.
    #[serde(default)]
    pub liked: Option<bool>,
}

/// One page of a paginated listing.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PageResponse<T> {
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub pages: i64,
    #[serde(default)]
    pub current: i64,
    #[serde(default)]
    pub size: i64,
    #[serde(default = "Vec::new")]
    pub records: Vec<T>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArticleRequest {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ArticleImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ArticleStatus>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArticleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ArticleImage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ArticleStatus>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReviewRequest {
    pub action: ReviewAction,
    pub comment: String,
}

/// Filters for the public article listing. Unset fields are left off the query string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArticleQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub status: Option<ArticleStatus>,
    pub author_id: Option<i64>,
    pub keyword: Option<String>,
}

impl ArticleQuery {
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = page_pairs(self.page, self.size);
        if let Some(status) = self.status {
            pairs.push(("status".to_owned(), status.as_str().to_owned()));
        }
        if let Some(author_id) = self.author_id {
            pairs.push(("authorId".to_owned(), author_id.to_string()));
        }
        if let Some(keyword) = self.keyword.as_deref().filter(|k| !k.is_empty()) {
            pairs.push(("keyword".to_owned(), keyword.to_owned()));
        }
        pairs
    }
}

pub(crate) fn page_pairs(page: Option<u32>, size: Option<u32>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if let Some(page) = page {
        pairs.push(("page".to_owned(), page.to_string()));
    }
    if let Some(size) = size {
        pairs.push(("size".to_owned(), size.to_string()));
    }
    pairs
}

// =============================================================================
// TOOLS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_owned(), content: content.into() }
    }
}

/// Body of an AI chat proxy call. `model` is one of `x1`, `pro`, `lite`, `max`, `ultra`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

// =============================================================================
// SERDE HELPERS
// =============================================================================

/// Accept a string, a number, or an array of numbers (Jackson `LocalDateTime`
/// without a date format) and keep it as display text.
fn deserialize_lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) => Ok(Some(s)),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        serde_json::Value::Array(parts) => {
            let mut out = Vec::with_capacity(parts.len());
            for part in parts {
                let n = part
                    .as_i64()
                    .ok_or_else(|| D::Error::custom("expected numeric date-time component"))?;
                out.push(n);
            }
            Ok(Some(format_date_parts(&out)))
        }
        other => Err(D::Error::custom(format!("expected date-time, got {other}"))),
    }
}

fn format_date_parts(parts: &[i64]) -> String {
    let get = |i: usize| parts.get(i).copied().unwrap_or(0);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        get(0),
        get(1),
        get(2),
        get(3),
        get(4),
        get(5)
    )
}
