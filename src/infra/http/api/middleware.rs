use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode, header::AUTHORIZATION};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics::counter;
use tracing::warn;

use crate::application::session::{SessionError, token_from_header};

use super::error::ApiError;
use super::state::ApiState;

const SOURCE: &str = "infra::http::api::admin_auth";

pub const ADMIN_AUTH_REJECTED: &str = "quillpress_admin_auth_rejected_total";

/// Verifies the session token before any admin handler runs.
pub async fn admin_auth(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(token_from_header)
        .map(str::to_string);

    let result = match token {
        Some(token) => state.sessions.verify(&token).await,
        None => Err(SessionError::Missing),
    };

    let user = match result {
        Ok(user) => user,
        Err(SessionError::Unavailable(detail)) => {
            warn!(
                target = SOURCE,
                detail = %detail,
                "session provider unavailable"
            );
            return ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                SOURCE,
                "認証サービスに接続できません。",
            )
            .with_detail(detail)
            .into_response();
        }
        Err(err) => {
            counter!(ADMIN_AUTH_REJECTED).increment(1);
            return ApiError::new(state.auth_failure_status, SOURCE, err.to_string())
                .into_response();
        }
    };

    request.extensions_mut().insert(user.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(user);
    response
}
