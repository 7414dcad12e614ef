use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::RepoError;
use crate::domain::entities::{AuthorSummary, ImageRef, PostRecord, PostWithAuthor};
use crate::domain::types::PostStatus;

use super::super::util::map_domain_error;

pub(crate) const POST_COLUMNS: &str = "p.id, p.title, p.excerpt, p.content, p.read_time, \
     p.status, p.image_url, p.image_public_id, p.author_id, p.created_at, p.updated_at";

#[derive(sqlx::FromRow)]
pub(crate) struct PostRow {
    pub(crate) id: Uuid,
    pub(crate) title: String,
    pub(crate) excerpt: String,
    pub(crate) content: String,
    pub(crate) read_time: i32,
    pub(crate) status: PostStatus,
    pub(crate) image_url: Option<String>,
    pub(crate) image_public_id: Option<String>,
    pub(crate) author_id: Uuid,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

impl TryFrom<PostRow> for PostRecord {
    type Error = RepoError;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        let image =
            ImageRef::from_parts(row.image_url, row.image_public_id).map_err(map_domain_error)?;
        Ok(Self {
            id: row.id,
            title: row.title,
            excerpt: row.excerpt,
            content: row.content,
            read_time: row.read_time,
            status: row.status,
            image,
            author_id: row.author_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PostWithAuthorRow {
    #[sqlx(flatten)]
    pub(crate) post: PostRow,
    pub(crate) author_name: String,
    pub(crate) author_image: Option<String>,
}

impl TryFrom<PostWithAuthorRow> for PostWithAuthor {
    type Error = RepoError;

    fn try_from(row: PostWithAuthorRow) -> Result<Self, Self::Error> {
        Ok(Self {
            post: PostRecord::try_from(row.post)?,
            author: AuthorSummary {
                name: row.author_name,
                image: row.author_image,
            },
        })
    }
}

/// Split an optional image into the two nullable columns that store it.
pub(crate) fn image_columns(image: Option<ImageRef>) -> (Option<String>, Option<String>) {
    match image {
        Some(ImageRef { url, public_id }) => (Some(url), Some(public_id)),
        None => (None, None),
    }
}
