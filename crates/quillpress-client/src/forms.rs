//! Form state for the admin editors.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use quillpress_api_types::{CategoryIdRef, CategoryView, CategoryWriteRequest, PostView, PostWriteRequest};

pub const TITLE_REQUIRED: &str = "タイトルは必須です";
pub const CONTENT_REQUIRED: &str = "内容は必須です";
pub const CATEGORY_NAME_REQUIRED: &str = "カテゴリー名は必須です";

/// Blocks a second submission while one is in flight.
#[derive(Debug, Clone, Default)]
pub struct SubmitGuard {
    busy: Arc<AtomicBool>,
}

/// Held for the duration of one submission; releases the guard on drop.
#[derive(Debug)]
pub struct SubmitPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for SubmitPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl SubmitGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` when another submission already holds the guard.
    pub fn try_begin(&self) -> Option<SubmitPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmitPermit {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_submitting(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFormErrors {
    pub title: Option<&'static str>,
    pub content: Option<&'static str>,
}

impl PostFormErrors {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    pub thumbnail_image_key: Option<String>,
    pub category_ids: Vec<i64>,
}

impl PostForm {
    pub fn from_post(post: &PostView) -> Self {
        Self {
            title: post.title.clone(),
            content: post.content.clone(),
            thumbnail_image_key: post.thumbnail_image_key.clone(),
            category_ids: post.category_ids(),
        }
    }

    /// Selects the category if it was unselected, otherwise clears it.
    pub fn toggle_category(&mut self, id: i64) {
        if let Some(position) = self.category_ids.iter().position(|existing| *existing == id) {
            self.category_ids.remove(position);
        } else {
            self.category_ids.push(id);
        }
    }

    pub fn set_thumbnail(&mut self, key: Option<String>) {
        self.thumbnail_image_key = key.filter(|key| !key.trim().is_empty());
    }

    pub fn validate(&self) -> PostFormErrors {
        PostFormErrors {
            title: self.title.trim().is_empty().then_some(TITLE_REQUIRED),
            content: self.content.trim().is_empty().then_some(CONTENT_REQUIRED),
        }
    }

    pub fn to_request(&self) -> Result<PostWriteRequest, PostFormErrors> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(PostWriteRequest {
            title: self.title.trim().to_string(),
            content: self.content.clone(),
            thumbnail_image_key: self.thumbnail_image_key.clone(),
            categories: self
                .category_ids
                .iter()
                .map(|id| CategoryIdRef { id: *id })
                .collect(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryForm {
    pub name: String,
}

impl CategoryForm {
    pub fn from_category(category: &CategoryView) -> Self {
        Self {
            name: category.name.clone(),
        }
    }

    pub fn to_request(&self) -> Result<CategoryWriteRequest, &'static str> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CATEGORY_NAME_REQUIRED);
        }
        Ok(CategoryWriteRequest {
            name: name.to_string(),
        })
    }
}
