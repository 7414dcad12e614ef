//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::{error::DomainError, types::PostStatus};

/// Handle to an asset held by the image host.
///
/// `public_id` is the only thing needed to delete the asset later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    pub url: String,
    pub public_id: String,
}

impl ImageRef {
    pub fn new(url: impl Into<String>, public_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            public_id: public_id.into(),
        }
    }

    /// Rebuild a reference from the two nullable columns that store it.
    ///
    /// A post either has both halves or neither.
    pub fn from_parts(
        url: Option<String>,
        public_id: Option<String>,
    ) -> Result<Option<Self>, DomainError> {
        match (url, public_id) {
            (Some(url), Some(public_id)) => Ok(Some(Self { url, public_id })),
            (None, None) => Ok(None),
            (Some(_), None) => Err(DomainError::invariant(
                "image url is set without an image public id",
            )),
            (None, Some(_)) => Err(DomainError::invariant(
                "image public id is set without an image url",
            )),
        }
    }

    pub fn same_asset(&self, other: &ImageRef) -> bool {
        self.public_id == other.public_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: Uuid,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub read_time: i32,
    pub status: PostStatus,
    pub image: Option<ImageRef>,
    pub author_id: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorSummary {
    pub name: String,
    pub image: Option<String>,
}

/// Post joined with its author's display fields, as served by read paths.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostWithAuthor {
    pub post: PostRecord,
    pub author: AuthorSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorRecord {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: Uuid,
    pub author_id: Uuid,
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub expires_at: OffsetDateTime,
    pub revoked_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}
