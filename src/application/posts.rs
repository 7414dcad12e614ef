//! Post lifecycle: validate, persist, then reconcile the hero image.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::images::{ImageCleanup, ImageStore, discard_image};
use crate::application::repos::{
    CreatePostParams, PostListScope, PostUpdate, PostsRepo, PostsWriteRepo, RepoError,
    UpdatePostParams,
};
use crate::domain::entities::{ImageRef, PostRecord, PostWithAuthor};
use crate::domain::posts::{PostInput, ValidationError, validate_post};

#[derive(Debug, Error)]
pub enum PostServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("post not found")]
    NotFound,
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for PostServiceError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => PostServiceError::NotFound,
            other => PostServiceError::Repo(other),
        }
    }
}

/// A committed write plus what happened to the image it orphaned, if any.
#[derive(Debug, Clone)]
pub struct PostMutation {
    pub post: PostRecord,
    pub image_cleanup: ImageCleanup,
}

#[derive(Clone)]
pub struct PostService {
    reader: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    images: Arc<dyn ImageStore>,
}

impl PostService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            reader,
            writer,
            images,
        }
    }

    pub async fn list(&self, scope: PostListScope) -> Result<Vec<PostWithAuthor>, PostServiceError> {
        Ok(self.reader.list_posts(scope).await?)
    }

    /// Posts outside `scope` are reported as missing.
    pub async fn get(
        &self,
        id: Uuid,
        scope: PostListScope,
    ) -> Result<PostWithAuthor, PostServiceError> {
        match self.reader.find_by_id(id).await? {
            Some(found) if scope.admits(found.post.status) => Ok(found),
            _ => Err(PostServiceError::NotFound),
        }
    }

    pub async fn create(
        &self,
        payload: &Value,
        author_id: Uuid,
    ) -> Result<PostRecord, PostServiceError> {
        let input = validate_post(payload)?;
        let PostInput {
            title,
            excerpt,
            content,
            read_time,
            status,
            image,
        } = input;

        let post = self
            .writer
            .create_post(CreatePostParams {
                title,
                excerpt,
                content,
                read_time,
                status,
                image,
                author_id,
            })
            .await?;

        info!(
            target = "postdesk::application::posts",
            post_id = %post.id,
            author_id = %author_id,
            status = %post.status,
            "post created"
        );
        Ok(post)
    }

    /// Overwrite every field of `id`. The previous image is deleted only after
    /// the new row is committed and only when no longer referenced.
    pub async fn update(&self, id: Uuid, payload: &Value) -> Result<PostMutation, PostServiceError> {
        let input = validate_post(payload)?;
        let PostInput {
            title,
            excerpt,
            content,
            read_time,
            status,
            image,
        } = input;

        let PostUpdate { before, after } = self
            .writer
            .update_post(UpdatePostParams {
                id,
                title,
                excerpt,
                content,
                read_time,
                status,
                image,
            })
            .await?;

        let image_cleanup = match stale_image(before.image.as_ref(), after.image.as_ref()) {
            Some(stale) => discard_image(self.images.as_ref(), stale).await,
            None => ImageCleanup::NotNeeded,
        };

        info!(
            target = "postdesk::application::posts",
            post_id = %after.id,
            image_cleanup = image_cleanup.as_str(),
            "post updated"
        );
        Ok(PostMutation {
            post: after,
            image_cleanup,
        })
    }

    pub async fn delete(&self, id: Uuid) -> Result<PostMutation, PostServiceError> {
        let removed = self.writer.delete_post(id).await?;

        let image_cleanup = match removed.image.as_ref() {
            Some(image) => discard_image(self.images.as_ref(), image).await,
            None => ImageCleanup::NotNeeded,
        };

        info!(
            target = "postdesk::application::posts",
            post_id = %removed.id,
            image_cleanup = image_cleanup.as_str(),
            "post deleted"
        );
        Ok(PostMutation {
            post: removed,
            image_cleanup,
        })
    }
}

fn stale_image<'a>(before: Option<&'a ImageRef>, after: Option<&ImageRef>) -> Option<&'a ImageRef> {
    match (before, after) {
        (Some(old), Some(new)) if old.same_asset(new) => None,
        (Some(old), _) => Some(old),
        (None, _) => None,
    }
}
