pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};

use crate::infra::http::middleware::{log_responses, set_request_context};

/// All routes, with session resolution, response logging and the upload
/// body limit applied.
pub fn build_router(state: ApiState, max_request_bytes: usize) -> Router {
    let auth_state = state.clone();

    Router::new()
        .route(
            "/posts",
            get(handlers::list_posts).post(handlers::create_post),
        )
        .route(
            "/posts/{id}",
            get(handlers::get_post)
                .put(handlers::update_post)
                .delete(handlers::delete_post),
        )
        .route("/upload", post(handlers::upload_image))
        .route("/delete-image", post(handlers::delete_image))
        .route("/_health/db", get(handlers::db_health))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_request_bytes))
        .layer(axum_middleware::from_fn_with_state(
            auth_state,
            middleware::resolve_viewer,
        ))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
