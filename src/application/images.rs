//! Port to the external image host and the best-effort cleanup helper.

use async_trait::async_trait;
use bytes::Bytes;
use metrics::counter;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::entities::ImageRef;

pub const METRIC_IMAGE_UPLOAD_TOTAL: &str = "postdesk_image_upload_total";
pub const METRIC_IMAGE_CLEANUP_TOTAL: &str = "postdesk_image_cleanup_total";

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub image: ImageRef,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: Option<String>,
}

#[derive(Debug, Error)]
pub enum ImageUploadError {
    #[error("image host request failed: {0}")]
    Transport(String),
    #[error("image host rejected upload with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("image host returned an unreadable response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum ImageDeleteError {
    #[error("image host request failed: {0}")]
    Transport(String),
    #[error("image host refused deletion: {result}")]
    Rejected { result: String },
    #[error("image host returned an unreadable response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Logical folder every upload is filed under.
    fn folder(&self) -> &str;

    async fn upload(&self, upload: ImageUpload) -> Result<UploadedImage, ImageUploadError>;

    async fn delete(&self, public_id: &str) -> Result<(), ImageDeleteError>;
}

/// Outcome of removing an asset that no post references anymore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageCleanup {
    NotNeeded,
    Deleted,
    Failed { reason: String },
}

impl ImageCleanup {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageCleanup::NotNeeded => "not_needed",
            ImageCleanup::Deleted => "deleted",
            ImageCleanup::Failed { .. } => "failed",
        }
    }
}

/// Whether `public_id` names an asset filed under `folder`.
pub fn in_folder(folder: &str, public_id: &str) -> bool {
    public_id
        .strip_prefix(folder)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|name| !name.is_empty() && !name.split('/').any(|s| s == ".."))
}

/// Upload through `store`, counting the outcome.
pub async fn store_image(
    store: &dyn ImageStore,
    upload: ImageUpload,
) -> Result<UploadedImage, ImageUploadError> {
    let file_name = upload.file_name.clone();
    let size = upload.bytes.len();
    let result = store.upload(upload).await;

    match &result {
        Ok(uploaded) => {
            counter!(METRIC_IMAGE_UPLOAD_TOTAL, "outcome" => "stored").increment(1);
            info!(
                target = "postdesk::application::images",
                file_name = %file_name,
                bytes = size,
                public_id = %uploaded.image.public_id,
                "image uploaded"
            );
        }
        Err(err) => {
            counter!(METRIC_IMAGE_UPLOAD_TOTAL, "outcome" => "failed").increment(1);
            warn!(
                target = "postdesk::application::images",
                file_name = %file_name,
                bytes = size,
                error = %err,
                "image upload failed"
            );
        }
    }
    result
}

/// Delete an orphaned asset without ever failing the caller.
pub async fn discard_image(store: &dyn ImageStore, image: &ImageRef) -> ImageCleanup {
    let outcome = match store.delete(&image.public_id).await {
        Ok(()) => {
            info!(
                target = "postdesk::application::images",
                public_id = %image.public_id,
                "deleted orphaned image"
            );
            ImageCleanup::Deleted
        }
        Err(err) => {
            warn!(
                target = "postdesk::application::images",
                public_id = %image.public_id,
                error = %err,
                "failed to delete orphaned image"
            );
            ImageCleanup::Failed {
                reason: err.to_string(),
            }
        }
    };

    counter!(METRIC_IMAGE_CLEANUP_TOTAL, "outcome" => outcome.as_str()).increment(1);
    outcome
}
