//! Image upload and deletion handlers

use axum::Json;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use postdesk_api_types::{DeleteImageRequest, SuccessResponse};
use tracing::info;

use crate::application::images::{ImageUpload, in_folder, store_image};
use crate::infra::http::api::error::{ApiError, codes};
use crate::infra::http::api::middleware::SessionAuthor;
use crate::infra::http::api::models::upload_response;
use crate::infra::http::api::state::ApiState;

use super::{image_delete_to_api, upload_to_api};

const FILE_FIELD: &str = "file";
const FALLBACK_FILE_NAME: &str = "upload";

pub async fn upload_image(
    State(state): State<ApiState>,
    SessionAuthor(principal): SessionAuthor,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let mut multipart = multipart.map_err(|err| {
        ApiError::bad_request("Expected a multipart form").with_detail(err.body_text())
    })?;
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_to_api)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_FILE_NAME)
            .to_string();
        let content_type = field
            .content_type()
            .map(str::to_string)
            .or_else(|| {
                mime_guess::from_path(&file_name)
                    .first()
                    .map(|mime| mime.essence_str().to_string())
            });
        let bytes = field.bytes().await.map_err(multipart_to_api)?;

        upload = Some(ImageUpload {
            file_name,
            content_type,
            bytes,
        });
        break;
    }

    let upload = upload
        .filter(|upload| !upload.bytes.is_empty())
        .ok_or_else(|| ApiError::bad_request("No file provided"))?;

    info!(
        target = "postdesk::http::api::images",
        author_id = %principal.author_id,
        file_name = %upload.file_name,
        bytes = upload.bytes.len(),
        "forwarding image upload"
    );

    let uploaded = store_image(state.images.as_ref(), upload)
        .await
        .map_err(upload_to_api)?;

    Ok(Json(upload_response(uploaded)))
}

fn multipart_to_api(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            codes::PAYLOAD_TOO_LARGE,
            "Upload exceeds the size limit",
        )
        .with_detail(err.body_text())
    } else {
        ApiError::bad_request("Failed to read upload").with_detail(err.body_text())
    }
}

pub async fn delete_image(
    State(state): State<ApiState>,
    SessionAuthor(principal): SessionAuthor,
    payload: Result<Json<DeleteImageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(|err| {
        ApiError::bad_request("Request body must be a JSON object").with_detail(err.body_text())
    })?;

    let public_id = payload
        .public_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("No public ID provided"))?;

    if !in_folder(state.images.folder(), public_id) {
        return Err(ApiError::bad_request("Image is outside the upload folder")
            .with_detail(format!("public id `{public_id}` rejected")));
    }

    state
        .images
        .delete(public_id)
        .await
        .map_err(image_delete_to_api)?;

    info!(
        target = "postdesk::http::api::images",
        author_id = %principal.author_id,
        public_id = %public_id,
        "image deleted on request"
    );

    Ok(Json(SuccessResponse::OK))
}
