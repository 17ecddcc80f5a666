pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod state;

pub use state::ApiState;

use axum::{Router, extract::DefaultBodyLimit, middleware as axum_middleware, routing::get, routing::post};

use crate::infra::http::RouterState;

/// Multipart framing allowance on top of the configured file size.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_api_router(state: RouterState) -> Router<RouterState> {
    let upload_limit = usize::try_from(state.api.storage.max_bytes())
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let admin = Router::new()
        .route(
            "/api/admin/posts",
            get(handlers::posts::list_posts).post(handlers::posts::create_post),
        )
        .route(
            "/api/admin/posts/{id}",
            get(handlers::posts::get_post)
                .put(handlers::posts::update_post)
                .delete(handlers::posts::delete_post),
        )
        .route(
            "/api/admin/categories",
            get(handlers::categories::list_categories)
                .post(handlers::categories::create_category),
        )
        .route(
            "/api/admin/categories/{id}",
            get(handlers::categories::get_category)
                .put(handlers::categories::update_category)
                .delete(handlers::categories::delete_category),
        )
        .route(
            "/api/admin/uploads",
            post(handlers::uploads::upload_thumbnail).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::admin_auth,
        ));

    let public = Router::new()
        .route("/api/posts", get(handlers::public::list_posts))
        .route("/api/posts/{id}", get(handlers::public::get_post));

    public.merge(admin)
}
