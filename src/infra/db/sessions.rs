use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{CreateSessionParams, RepoError, SessionsRepo};
use crate::domain::entities::SessionRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    author_id: Uuid,
    prefix: String,
    hashed_secret: Vec<u8>,
    expires_at: OffsetDateTime,
    revoked_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
}

impl From<SessionRow> for SessionRecord {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id,
            author_id: row.author_id,
            prefix: row.prefix,
            hashed_secret: row.hashed_secret,
            expires_at: row.expires_at,
            revoked_at: row.revoked_at,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl SessionsRepo for PostgresRepositories {
    async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<SessionRecord, RepoError> {
        let row = sqlx::query_as::<_, SessionRow>(
            "INSERT INTO sessions (id, author_id, prefix, hashed_secret, expires_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, author_id, prefix, hashed_secret, expires_at, revoked_at, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(params.author_id)
        .bind(params.prefix)
        .bind(params.hashed_secret)
        .bind(params.expires_at)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(SessionRecord::from(row))
    }

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<SessionRecord>, RepoError> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT id, author_id, prefix, hashed_secret, expires_at, revoked_at, created_at \
             FROM sessions WHERE prefix = $1",
        )
        .bind(prefix)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(SessionRecord::from))
    }

    async fn revoke_session(
        &self,
        id: Uuid,
        revoked_at: OffsetDateTime,
    ) -> Result<(), RepoError> {
        let result = sqlx::query(
            "UPDATE sessions SET revoked_at = COALESCE(revoked_at, $2) WHERE id = $1",
        )
        .bind(id)
        .bind(revoked_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
