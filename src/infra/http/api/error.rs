use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use quillpress_api_types::{CATEGORY_NOT_FOUND_MESSAGE, POST_NOT_FOUND_MESSAGE};
use serde::Serialize;

use crate::application::admin::categories::AdminCategoryError;
use crate::application::admin::posts::AdminPostError;
use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;
use crate::infra::storage::StorageError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub message: String,
}

/// JSON error response carrying `{"message": …}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    source: &'static str,
    message: String,
    detail: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, source: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            source,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "infra::http::api", message)
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "infra::http::api", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "infra::http::api",
            message,
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = self.detail.unwrap_or_else(|| self.message.clone());
        let body = ApiErrorBody {
            message: self.message,
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(self.source, self.status, detail).attach(&mut response);
        response
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "infra::http::api::json",
            rejection.body_text(),
        )
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "infra::http::api::path",
            rejection.body_text(),
        )
    }
}

fn repo_to_api(source: &'static str, err: RepoError, not_found: &'static str) -> ApiError {
    match err {
        RepoError::NotFound => ApiError::new(StatusCode::NOT_FOUND, source, not_found),
        other => ApiError::new(StatusCode::BAD_REQUEST, source, other.to_string()),
    }
}

impl From<AdminPostError> for ApiError {
    fn from(err: AdminPostError) -> Self {
        const SOURCE: &str = "infra::http::api::posts";
        match err {
            AdminPostError::NotFound(id) => {
                ApiError::new(StatusCode::NOT_FOUND, SOURCE, POST_NOT_FOUND_MESSAGE)
                    .with_detail(format!("post {id} not found"))
            }
            AdminPostError::Validation(err) => {
                ApiError::new(StatusCode::BAD_REQUEST, SOURCE, err.to_string())
            }
            AdminPostError::Repo(err) => repo_to_api(SOURCE, err, POST_NOT_FOUND_MESSAGE),
        }
    }
}

impl From<AdminCategoryError> for ApiError {
    fn from(err: AdminCategoryError) -> Self {
        const SOURCE: &str = "infra::http::api::categories";
        match err {
            AdminCategoryError::NotFound(id) => {
                ApiError::new(StatusCode::NOT_FOUND, SOURCE, CATEGORY_NOT_FOUND_MESSAGE)
                    .with_detail(format!("category {id} not found"))
            }
            AdminCategoryError::Validation(err) => {
                ApiError::new(StatusCode::BAD_REQUEST, SOURCE, err.to_string())
            }
            AdminCategoryError::Repo(err) => repo_to_api(SOURCE, err, CATEGORY_NOT_FOUND_MESSAGE),
        }
    }
}

/// Public reads share the post not-found message.
impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        repo_to_api("infra::http::api::public", err, POST_NOT_FOUND_MESSAGE)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        const SOURCE: &str = "infra::http::api::uploads";
        match err {
            StorageError::PayloadTooLarge { .. } => {
                ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, SOURCE, err.to_string())
            }
            StorageError::EmptyPayload
            | StorageError::InvalidKey
            | StorageError::UnknownBucket(_)
            | StorageError::PayloadStream { .. } => {
                ApiError::new(StatusCode::BAD_REQUEST, SOURCE, err.to_string())
            }
            StorageError::NotFound | StorageError::Io(_) => {
                let detail = err.to_string();
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    SOURCE,
                    "サムネイルの保存に失敗しました。",
                )
                .with_detail(detail)
            }
        }
    }
}
