use axum::Json;
use axum::extract::{Extension, Multipart, State};
use futures::TryStreamExt;
use metrics::histogram;
use quillpress_api_types::UploadResponse;
use tracing::info;

use crate::application::session::SessionUser;
use crate::infra::storage::StorageError;

use super::super::error::ApiError;
use super::super::state::ApiState;

pub const UPLOAD_SIZE_BYTES: &str = "quillpress_upload_size_bytes";

/// Stores the multipart `file` field in the thumbnail bucket.
pub async fn upload_thumbnail(
    State(state): State<ApiState>,
    Extension(user): Extension<SessionUser>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let actor = ApiState::actor_label(&user);

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        ApiError::bad_request("invalid multipart payload").with_detail(err.body_text())
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let stream = field.map_err(|err| StorageError::PayloadStream {
            source: Box::new(err),
        });
        let stored = state.storage.store_stream(&filename, stream).await?;

        let url = state
            .thumbnails
            .resolve(Some(&stored.key))
            .ok_or_else(|| ApiError::internal("generated key could not be resolved"))?;

        histogram!(UPLOAD_SIZE_BYTES).record(stored.size_bytes as f64);
        info!(
            target = "infra::http::api::uploads",
            actor = %actor,
            key = %stored.key,
            size_bytes = stored.size_bytes,
            checksum = %stored.checksum,
            "thumbnail stored"
        );

        return Ok(Json(UploadResponse {
            key: stored.key,
            url,
        }));
    }

    Err(ApiError::bad_request("missing file field"))
}
