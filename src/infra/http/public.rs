use std::sync::Arc;

use axum::{
    Form, Router,
    body::Body,
    extract::{Path, State, rejection::PathRejection},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use tracing::error;

use crate::{
    application::{
        contact::{ContactError, ContactService},
        error::HttpError,
        feed::FeedService,
    },
    domain::contact::ContactMessage,
    infra::{
        db::PostgresRepositories,
        storage::{ObjectStorage, StorageError},
    },
    presentation::views::{
        ArticleTemplate, ContactTemplate, ContactView, IndexTemplate, IndexView, LayoutChrome,
        LayoutContext, article_view, post_card, render_not_found_response,
        render_template_response,
    },
};

use super::{RouterState, db_health_response};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub contact: Arc<ContactService>,
    pub storage: Arc<ObjectStorage>,
    pub db: Arc<PostgresRepositories>,
    pub chrome: LayoutChrome,
}

pub fn build_router() -> Router<RouterState> {
    Router::new()
        .route("/", get(index))
        .route("/article/{id}", get(article))
        .route("/contact", get(contact_form).post(submit_contact))
        .route("/storage/{bucket}/{*key}", get(serve_object))
        .route("/_health/db", get(public_health))
        .fallback(not_found)
}

async fn index(State(state): State<HttpState>) -> Response {
    let offset = state.chrome.utc_offset;
    match state.feed.list_posts().await {
        Ok(posts) => {
            let posts = posts.iter().map(|post| post_card(post, offset)).collect();
            let title = state.chrome.site_title.clone();
            let view = LayoutContext::new(state.chrome, title, IndexView { posts });
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn article(State(state): State<HttpState>, id: Result<Path<i64>, PathRejection>) -> Response {
    let Ok(Path(id)) = id else {
        return render_not_found_response(state.chrome);
    };

    match state.feed.find_post(id).await {
        Ok(Some(post)) => {
            let title = post.title.clone();
            let content = article_view(post, state.chrome.utc_offset);
            let view = LayoutContext::new(state.chrome, title, content);
            render_template_response(ArticleTemplate { view }, StatusCode::OK)
        }
        Ok(None) => render_not_found_response(state.chrome),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn contact_form(State(state): State<HttpState>) -> Response {
    let view = LayoutContext::new(state.chrome, "問合わせフォーム", ContactView::default());
    render_template_response(ContactTemplate { view }, StatusCode::OK)
}

async fn submit_contact(
    State(state): State<HttpState>,
    Form(message): Form<ContactMessage>,
) -> Response {
    const SOURCE: &str = "infra::http::public::submit_contact";

    let (content, status) = match state.contact.submit(message.clone()).await {
        Ok(()) => (ContactView::sent(), StatusCode::OK),
        Err(ContactError::Invalid(errors)) => (
            ContactView::with_errors(message, errors),
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        Err(err @ ContactError::Delivery(_)) => {
            error!(target = SOURCE, error = %err, "contact delivery failed");
            (ContactView::failed(message), StatusCode::BAD_GATEWAY)
        }
    };

    let view = LayoutContext::new(state.chrome, "問合わせフォーム", content);
    render_template_response(ContactTemplate { view }, status)
}

async fn serve_object(
    State(state): State<HttpState>,
    Path((bucket, key)): Path<(String, String)>,
) -> Response {
    const SOURCE: &str = "infra::http::public::serve_object";

    match state.storage.read(&bucket, &key).await {
        Ok(bytes) => build_object_response(&key, bytes),
        Err(
            StorageError::NotFound | StorageError::InvalidKey | StorageError::UnknownBucket(_),
        ) => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Object not found",
            format!("no object `{key}` in bucket `{bucket}`"),
        )
        .into_response(),
        Err(err) => {
            error!(
                target = SOURCE,
                bucket = %bucket,
                key = %key,
                error = %err,
                "failed to read stored object"
            );
            HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read stored object",
                &err,
            )
            .into_response()
        }
    }
}

fn build_object_response(key: &str, bytes: Bytes) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(key).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    // Generated keys are never reused.
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.health_check().await)
}

async fn not_found(State(state): State<HttpState>) -> Response {
    render_not_found_response(state.chrome)
}
