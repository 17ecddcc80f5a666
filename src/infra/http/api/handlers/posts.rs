use axum::Json;
use axum::extract::{Extension, State};
use quillpress_api_types::{
    CreatedResponse, MessageResponse, PostResponse, PostWriteRequest, PostsResponse,
};

use crate::application::admin::posts::PostCommand;
use crate::application::session::SessionUser;

use super::super::error::ApiError;
use super::super::extract::{ApiJson, ApiPath};
use super::super::state::ApiState;

fn command_from_request(request: PostWriteRequest) -> PostCommand {
    PostCommand {
        title: request.title,
        content: request.content,
        thumbnail_image_key: request.thumbnail_image_key,
        category_ids: request.categories.into_iter().map(|entry| entry.id).collect(),
    }
}

pub async fn list_posts(State(state): State<ApiState>) -> Result<Json<PostsResponse>, ApiError> {
    let posts = state.posts.list_posts().await?;
    Ok(Json(PostsResponse { posts }))
}

pub async fn get_post(
    State(state): State<ApiState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.posts.find_post(id).await?;
    Ok(Json(PostResponse { post }))
}

pub async fn create_post(
    State(state): State<ApiState>,
    Extension(user): Extension<SessionUser>,
    ApiJson(payload): ApiJson<PostWriteRequest>,
) -> Result<Json<CreatedResponse>, ApiError> {
    let actor = ApiState::actor_label(&user);
    let post = state
        .posts
        .create_post(&actor, command_from_request(payload))
        .await?;
    Ok(Json(CreatedResponse { id: post.id }))
}

pub async fn update_post(
    State(state): State<ApiState>,
    Extension(user): Extension<SessionUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<PostWriteRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let actor = ApiState::actor_label(&user);
    state
        .posts
        .update_post(&actor, id, command_from_request(payload))
        .await?;
    Ok(Json(MessageResponse::ok()))
}

pub async fn delete_post(
    State(state): State<ApiState>,
    Extension(user): Extension<SessionUser>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let actor = ApiState::actor_label(&user);
    state.posts.delete_post(&actor, id).await?;
    Ok(Json(MessageResponse::ok()))
}
