//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: i64,
    pub title: String,
    pub content: String,
    /// Object-storage key of the thumbnail, never a URL.
    pub thumbnail_image_key: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// The `(id, name)` projection of a category attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub id: i64,
    pub name: String,
}

/// A post together with the categories currently linked through `post_categories`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostWithCategories {
    pub post: PostRecord,
    pub categories: Vec<CategorySummary>,
}

impl PostWithCategories {
    pub fn category_ids(&self) -> Vec<i64> {
        self.categories.iter().map(|category| category.id).collect()
    }
}
