//! Read-side post queries shared by the public API and the article pages.

use std::sync::Arc;

use quillpress_api_types::{CategoryRef, PostCategoryEntry, PostView};

use crate::application::repos::{PostsRepo, RepoError};
use crate::application::thumbnails::ThumbnailResolver;
use crate::domain::entities::PostWithCategories;

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    thumbnails: Arc<ThumbnailResolver>,
}

impl FeedService {
    pub fn new(posts: Arc<dyn PostsRepo>, thumbnails: Arc<ThumbnailResolver>) -> Self {
        Self { posts, thumbnails }
    }

    pub async fn list_posts(&self) -> Result<Vec<PostView>, RepoError> {
        let posts = self.posts.list_posts().await?;
        Ok(posts
            .into_iter()
            .map(|post| build_post_view(post, &self.thumbnails))
            .collect())
    }

    pub async fn find_post(&self, id: i64) -> Result<Option<PostView>, RepoError> {
        let post = self.posts.find_post(id).await?;
        Ok(post.map(|post| build_post_view(post, &self.thumbnails)))
    }
}

/// Converts a stored post into its wire shape, resolving the thumbnail URL.
pub fn build_post_view(post: PostWithCategories, thumbnails: &ThumbnailResolver) -> PostView {
    let PostWithCategories { post, categories } = post;
    let thumbnail_url = thumbnails.resolve(post.thumbnail_image_key.as_deref());

    PostView {
        id: post.id,
        title: post.title,
        content: post.content,
        thumbnail_image_key: post.thumbnail_image_key,
        thumbnail_url,
        created_at: post.created_at,
        updated_at: post.updated_at,
        post_categories: categories
            .into_iter()
            .map(|category| PostCategoryEntry {
                category: CategoryRef {
                    id: category.id,
                    name: category.name,
                },
            })
            .collect(),
    }
}
