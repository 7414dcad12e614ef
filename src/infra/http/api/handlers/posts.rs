//! Posts handlers

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use postdesk_api_types::SuccessResponse;
use serde_json::Value;

use super::{parse_post_id, post_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::middleware::{SessionAuthor, Viewer};
use crate::infra::http::api::models::{
    PostListQuery, post_response, post_with_author_response,
};
use crate::infra::http::api::state::ApiState;

pub async fn list_posts(
    State(state): State<ApiState>,
    viewer: Viewer,
    query: Result<Query<PostListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) =
        query.map_err(|err| ApiError::bad_request("Invalid query").with_detail(err.body_text()))?;

    let posts = state
        .posts
        .list(viewer.scope(query.status))
        .await
        .map_err(post_to_api)?;

    Ok(Json(
        posts
            .into_iter()
            .map(post_with_author_response)
            .collect::<Vec<_>>(),
    ))
}

pub async fn get_post(
    State(state): State<ApiState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_post_id(&id)?;
    let post = state
        .posts
        .get(id, viewer.scope(None))
        .await
        .map_err(post_to_api)?;

    Ok(Json(post_with_author_response(post)))
}

pub async fn create_post(
    State(state): State<ApiState>,
    SessionAuthor(principal): SessionAuthor,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(json_to_api)?;

    let post = state
        .posts
        .create(&payload, principal.author_id)
        .await
        .map_err(post_to_api)?;

    Ok((StatusCode::CREATED, Json(post_response(post))))
}

pub async fn update_post(
    State(state): State<ApiState>,
    SessionAuthor(_principal): SessionAuthor,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_post_id(&id)?;
    let Json(payload) = payload.map_err(json_to_api)?;

    let mutation = state
        .posts
        .update(id, &payload)
        .await
        .map_err(post_to_api)?;

    Ok(Json(post_response(mutation.post)))
}

pub async fn delete_post(
    State(state): State<ApiState>,
    SessionAuthor(_principal): SessionAuthor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_post_id(&id)?;
    state.posts.delete(id).await.map_err(post_to_api)?;

    Ok(Json(SuccessResponse::OK))
}

fn json_to_api(err: JsonRejection) -> ApiError {
    ApiError::bad_request("Request body must be a JSON object").with_detail(err.body_text())
}
