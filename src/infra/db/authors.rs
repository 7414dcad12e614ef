use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{AuthorsRepo, CreateAuthorParams, RepoError};
use crate::domain::entities::AuthorRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(Debug, sqlx::FromRow)]
struct AuthorRow {
    id: Uuid,
    name: String,
    image: Option<String>,
    created_at: OffsetDateTime,
}

impl From<AuthorRow> for AuthorRecord {
    fn from(row: AuthorRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            image: row.image,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl AuthorsRepo for PostgresRepositories {
    async fn create_author(&self, params: CreateAuthorParams) -> Result<AuthorRecord, RepoError> {
        let row = sqlx::query_as::<_, AuthorRow>(
            "INSERT INTO authors (id, name, image, created_at) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, name, image, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(params.name)
        .bind(params.image)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(AuthorRecord::from(row))
    }

    async fn find_author(&self, id: Uuid) -> Result<Option<AuthorRecord>, RepoError> {
        let row = sqlx::query_as::<_, AuthorRow>(
            "SELECT id, name, image, created_at FROM authors WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(AuthorRecord::from))
    }
}
