//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{
    AuthorRecord, ImageRef, PostRecord, PostWithAuthor, SessionRecord,
};
use crate::domain::types::PostStatus;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which posts a reader may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostListScope {
    /// Anonymous readers: published posts only.
    Public,
    /// Signed-in authors: every post, optionally narrowed to one status.
    Admin { status: Option<PostStatus> },
}

impl PostListScope {
    pub fn admits(&self, status: PostStatus) -> bool {
        match self {
            PostListScope::Public => status == PostStatus::Published,
            PostListScope::Admin { status: None } => true,
            PostListScope::Admin {
                status: Some(wanted),
            } => *wanted == status,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub read_time: i32,
    pub status: PostStatus,
    pub image: Option<ImageRef>,
    pub author_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: Uuid,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub read_time: i32,
    pub status: PostStatus,
    pub image: Option<ImageRef>,
}

/// Row state on both sides of a committed update.
#[derive(Debug, Clone)]
pub struct PostUpdate {
    pub before: PostRecord,
    pub after: PostRecord,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Newest first.
    async fn list_posts(&self, scope: PostListScope) -> Result<Vec<PostWithAuthor>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostWithAuthor>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    /// Locks the current row, overwrites it and commits. `NotFound` if the id
    /// is unknown.
    async fn update_post(&self, params: UpdatePostParams) -> Result<PostUpdate, RepoError>;

    /// Removes the row and returns what was stored. `NotFound` if the id is
    /// unknown.
    async fn delete_post(&self, id: Uuid) -> Result<PostRecord, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateAuthorParams {
    pub name: String,
    pub image: Option<String>,
}

#[async_trait]
pub trait AuthorsRepo: Send + Sync {
    async fn create_author(&self, params: CreateAuthorParams) -> Result<AuthorRecord, RepoError>;

    async fn find_author(&self, id: Uuid) -> Result<Option<AuthorRecord>, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateSessionParams {
    pub author_id: Uuid,
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub expires_at: OffsetDateTime,
}

#[async_trait]
pub trait SessionsRepo: Send + Sync {
    async fn create_session(&self, params: CreateSessionParams)
    -> Result<SessionRecord, RepoError>;

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<SessionRecord>, RepoError>;

    async fn revoke_session(&self, id: Uuid, revoked_at: OffsetDateTime)
    -> Result<(), RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
