use axum::Json;
use axum::extract::State;
use quillpress_api_types::{POST_NOT_FOUND_MESSAGE, PostResponse, PostsResponse};

use super::super::error::ApiError;
use super::super::extract::ApiPath;
use super::super::state::ApiState;

pub async fn list_posts(State(state): State<ApiState>) -> Result<Json<PostsResponse>, ApiError> {
    let posts = state.feed.list_posts().await?;
    Ok(Json(PostsResponse { posts }))
}

pub async fn get_post(
    State(state): State<ApiState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state
        .feed
        .find_post(id)
        .await?
        .ok_or_else(|| ApiError::not_found(POST_NOT_FOUND_MESSAGE))?;
    Ok(Json(PostResponse { post }))
}
