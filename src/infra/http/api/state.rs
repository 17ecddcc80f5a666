use std::sync::Arc;

use axum::http::StatusCode;

use crate::application::admin::categories::AdminCategoryService;
use crate::application::admin::posts::AdminPostService;
use crate::application::feed::FeedService;
use crate::application::session::{SessionProvider, SessionUser};
use crate::application::thumbnails::ThumbnailResolver;
use crate::infra::storage::ObjectStorage;

#[derive(Clone)]
pub struct ApiState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<AdminPostService>,
    pub categories: Arc<AdminCategoryService>,
    pub sessions: Arc<dyn SessionProvider>,
    pub storage: Arc<ObjectStorage>,
    pub thumbnails: Arc<ThumbnailResolver>,
    /// Status returned for missing or rejected session tokens.
    pub auth_failure_status: StatusCode,
}

impl ApiState {
    pub fn actor_label(user: &SessionUser) -> String {
        match &user.email {
            Some(email) => format!("user:{}:{}", user.id, email),
            None => format!("user:{}", user.id),
        }
    }
}
