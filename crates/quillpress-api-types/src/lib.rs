//! Request and response bodies shared by the quillpress server and its clients.
//!
//! Field names follow the camelCase wire format of the blog API, and timestamps are
//! RFC 3339 strings.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Name of the object-storage bucket holding post thumbnails.
pub const THUMBNAIL_BUCKET: &str = "post_thumbnail";

/// Message returned when a post id has no matching row.
pub const POST_NOT_FOUND_MESSAGE: &str = "記事が見つかりません。";

/// Message returned when a category id has no matching row.
pub const CATEGORY_NOT_FOUND_MESSAGE: &str = "カテゴリーが見つかりません。";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCategoryEntry {
    pub category: CategoryRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub thumbnail_image_key: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default)]
    pub post_categories: Vec<PostCategoryEntry>,
}

impl PostView {
    pub fn category_ids(&self) -> Vec<i64> {
        self.post_categories
            .iter()
            .map(|entry| entry.category.id)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryView {
    pub id: i64,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostsResponse {
    pub posts: Vec<PostView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResponse {
    pub post: PostView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoriesResponse {
    pub categories: Vec<CategoryView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryResponse {
    pub category: CategoryView,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn ok() -> Self {
        Self {
            message: "OK".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub key: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryIdRef {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostWriteRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub thumbnail_image_key: Option<String>,
    #[serde(default)]
    pub categories: Vec<CategoryIdRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryWriteRequest {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn post_write_request_accepts_wire_names() {
        let body = json!({
            "title": "Hello",
            "content": "<p>body</p>",
            "thumbnailImageKey": "2026/10/abc.png",
            "categories": [{"id": 1}, {"id": 3}]
        });

        let request: PostWriteRequest = serde_json::from_value(body).expect("valid payload");
        assert_eq!(request.thumbnail_image_key.as_deref(), Some("2026/10/abc.png"));
        assert_eq!(
            request.categories,
            vec![CategoryIdRef { id: 1 }, CategoryIdRef { id: 3 }]
        );
    }

    #[test]
    fn post_write_request_defaults_optional_fields() {
        let request: PostWriteRequest =
            serde_json::from_value(json!({"title": "t", "content": "c"})).expect("valid payload");
        assert!(request.thumbnail_image_key.is_none());
        assert!(request.categories.is_empty());
    }

    #[test]
    fn post_view_serialises_camel_case_and_rfc3339() {
        let view = PostView {
            id: 7,
            title: "t".into(),
            content: "c".into(),
            thumbnail_image_key: None,
            thumbnail_url: None,
            created_at: time::macros::datetime!(2026-01-02 03:04:05 UTC),
            updated_at: time::macros::datetime!(2026-01-02 03:04:05 UTC),
            post_categories: vec![PostCategoryEntry {
                category: CategoryRef {
                    id: 1,
                    name: "Tech".into(),
                },
            }],
        };

        let value = serde_json::to_value(&view).expect("serialise");
        assert_eq!(value["createdAt"], "2026-01-02T03:04:05Z");
        assert_eq!(value["postCategories"][0]["category"]["name"], "Tech");
        assert!(value.get("thumbnailImageKey").is_some());
    }
}
