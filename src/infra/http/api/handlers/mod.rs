//! API handlers organized by resource type.
//!
//! Error conversions shared by the handlers live here.

mod health;
mod images;
mod posts;

pub use health::*;
pub use images::*;
pub use posts::*;

use uuid::Uuid;

use crate::application::images::{ImageDeleteError, ImageUploadError};
use crate::application::posts::PostServiceError;

use super::error::{ApiError, codes};
use super::models::violations;

pub(crate) fn post_to_api(err: PostServiceError) -> ApiError {
    match err {
        PostServiceError::Validation(validation) => ApiError::validation(violations(&validation)),
        PostServiceError::NotFound => ApiError::not_found("Post not found"),
        PostServiceError::Repo(repo) => {
            ApiError::internal(codes::INTERNAL, "Internal server error", &repo)
        }
    }
}

pub(crate) fn upload_to_api(err: ImageUploadError) -> ApiError {
    ApiError::internal(codes::UPLOAD, "Image upload failed", &err)
}

pub(crate) fn image_delete_to_api(err: ImageDeleteError) -> ApiError {
    ApiError::internal(codes::IMAGE_DELETE, "Image deletion failed", &err)
}

/// Malformed ids cannot name a post, so they read as missing.
pub(crate) fn parse_post_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw)
        .map_err(|_| ApiError::not_found("Post not found").with_detail(format!("malformed id `{raw}`")))
}
