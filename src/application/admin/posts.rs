use std::sync::Arc;

use quillpress_api_types::PostView;
use thiserror::Error;
use tracing::info;

use crate::application::admin::{dedupe_ids, ensure_non_empty};
use crate::application::feed::build_post_view;
use crate::application::repos::{
    CreatePostParams, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::application::thumbnails::ThumbnailResolver;
use crate::domain::entities::PostRecord;
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum AdminPostError {
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("post {0} not found")]
    NotFound(i64),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Payload of a create or full-replacement update.
#[derive(Debug, Clone)]
pub struct PostCommand {
    pub title: String,
    pub content: String,
    pub thumbnail_image_key: Option<String>,
    pub category_ids: Vec<i64>,
}

struct NormalizedPost {
    title: String,
    content: String,
    thumbnail_image_key: Option<String>,
    category_ids: Vec<i64>,
}

impl PostCommand {
    fn normalize(self) -> Result<NormalizedPost, DomainError> {
        ensure_non_empty(&self.title, "title")?;
        ensure_non_empty(&self.content, "content")?;

        let thumbnail_image_key = self.thumbnail_image_key.and_then(|key| {
            let trimmed = key.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        });

        Ok(NormalizedPost {
            title: self.title.trim().to_string(),
            content: self.content,
            thumbnail_image_key,
            category_ids: dedupe_ids(self.category_ids),
        })
    }
}

#[derive(Clone)]
pub struct AdminPostService {
    reader: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    thumbnails: Arc<ThumbnailResolver>,
}

impl AdminPostService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        thumbnails: Arc<ThumbnailResolver>,
    ) -> Self {
        Self {
            reader,
            writer,
            thumbnails,
        }
    }

    pub async fn list_posts(&self) -> Result<Vec<PostView>, AdminPostError> {
        let posts = self.reader.list_posts().await?;
        Ok(posts
            .into_iter()
            .map(|post| build_post_view(post, &self.thumbnails))
            .collect())
    }

    pub async fn find_post(&self, id: i64) -> Result<PostView, AdminPostError> {
        self.reader
            .find_post(id)
            .await?
            .map(|post| build_post_view(post, &self.thumbnails))
            .ok_or(AdminPostError::NotFound(id))
    }

    pub async fn create_post(
        &self,
        actor: &str,
        command: PostCommand,
    ) -> Result<PostRecord, AdminPostError> {
        let NormalizedPost {
            title,
            content,
            thumbnail_image_key,
            category_ids,
        } = command.normalize()?;

        let post = self
            .writer
            .create_post(CreatePostParams {
                title,
                content,
                thumbnail_image_key,
                category_ids,
            })
            .await?;

        info!(
            target = "application::admin::posts",
            actor,
            post_id = post.id,
            "post created"
        );
        Ok(post)
    }

    pub async fn update_post(
        &self,
        actor: &str,
        id: i64,
        command: PostCommand,
    ) -> Result<PostRecord, AdminPostError> {
        let NormalizedPost {
            title,
            content,
            thumbnail_image_key,
            category_ids,
        } = command.normalize()?;

        let previous_key = self
            .reader
            .find_post(id)
            .await?
            .ok_or(AdminPostError::NotFound(id))?
            .post
            .thumbnail_image_key;

        let post = self
            .writer
            .update_post(UpdatePostParams {
                id,
                title,
                content,
                thumbnail_image_key,
                category_ids,
            })
            .await
            .map_err(|err| not_found_or(err, id))?;

        if let Some(previous) = previous_key {
            if post.thumbnail_image_key.as_deref() != Some(previous.as_str()) {
                self.thumbnails.forget(&previous);
            }
        }

        info!(
            target = "application::admin::posts",
            actor,
            post_id = post.id,
            "post updated"
        );
        Ok(post)
    }

    pub async fn delete_post(&self, actor: &str, id: i64) -> Result<(), AdminPostError> {
        self.writer
            .delete_post(id)
            .await
            .map_err(|err| not_found_or(err, id))?;

        info!(
            target = "application::admin::posts",
            actor,
            post_id = id,
            "post deleted"
        );
        Ok(())
    }
}

fn not_found_or(err: RepoError, id: i64) -> AdminPostError {
    match err {
        RepoError::NotFound => AdminPostError::NotFound(id),
        other => AdminPostError::Repo(other),
    }
}
