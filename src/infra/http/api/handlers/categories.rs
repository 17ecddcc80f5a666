use axum::Json;
use axum::extract::{Extension, State};
use quillpress_api_types::{
    CategoriesResponse, CategoryResponse, CategoryView, CategoryWriteRequest, CreatedResponse,
    MessageResponse,
};

use crate::application::session::SessionUser;
use crate::domain::entities::CategoryRecord;

use super::super::error::ApiError;
use super::super::extract::{ApiJson, ApiPath};
use super::super::state::ApiState;

fn category_view(record: CategoryRecord) -> CategoryView {
    CategoryView {
        id: record.id,
        name: record.name,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

pub async fn list_categories(
    State(state): State<ApiState>,
) -> Result<Json<CategoriesResponse>, ApiError> {
    let categories = state.categories.list_categories().await?;
    Ok(Json(CategoriesResponse {
        categories: categories.into_iter().map(category_view).collect(),
    }))
}

pub async fn get_category(
    State(state): State<ApiState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let category = state.categories.find_category(id).await?;
    Ok(Json(CategoryResponse {
        category: category_view(category),
    }))
}

pub async fn create_category(
    State(state): State<ApiState>,
    Extension(user): Extension<SessionUser>,
    ApiJson(payload): ApiJson<CategoryWriteRequest>,
) -> Result<Json<CreatedResponse>, ApiError> {
    let actor = ApiState::actor_label(&user);
    let category = state
        .categories
        .create_category(&actor, &payload.name)
        .await?;
    Ok(Json(CreatedResponse { id: category.id }))
}

pub async fn update_category(
    State(state): State<ApiState>,
    Extension(user): Extension<SessionUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<CategoryWriteRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let actor = ApiState::actor_label(&user);
    state
        .categories
        .update_category(&actor, id, &payload.name)
        .await?;
    Ok(Json(MessageResponse::ok()))
}

pub async fn delete_category(
    State(state): State<ApiState>,
    Extension(user): Extension<SessionUser>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let actor = ApiState::actor_label(&user);
    state.categories.delete_category(&actor, id).await?;
    Ok(Json(MessageResponse::ok()))
}
