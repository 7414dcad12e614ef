use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CreatePostParams, PostUpdate, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::PostRecord;

use super::super::{PostgresRepositories, map_sqlx_error};
use super::types::{POST_COLUMNS, PostRow, image_columns};

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let CreatePostParams {
            title,
            excerpt,
            content,
            read_time,
            status,
            image,
            author_id,
        } = params;
        let (image_url, image_public_id) = image_columns(image);

        let now = OffsetDateTime::now_utc();
        let sql = format!(
            "INSERT INTO posts AS p ( \
                 id, title, excerpt, content, read_time, status, \
                 image_url, image_public_id, author_id, created_at, updated_at \
             ) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10) \
             RETURNING {POST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(title)
            .bind(excerpt)
            .bind(content)
            .bind(read_time)
            .bind(status)
            .bind(image_url)
            .bind(image_public_id)
            .bind(author_id)
            .bind(now)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        PostRecord::try_from(row)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostUpdate, RepoError> {
        let UpdatePostParams {
            id,
            title,
            excerpt,
            content,
            read_time,
            status,
            image,
        } = params;
        let (image_url, image_public_id) = image_columns(image);

        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let select = format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = $1 FOR UPDATE");
        let before = sqlx::query_as::<_, PostRow>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;

        let update = format!(
            "UPDATE posts AS p SET \
                 title = $2, excerpt = $3, content = $4, read_time = $5, status = $6, \
                 image_url = $7, image_public_id = $8, updated_at = $9 \
             WHERE p.id = $1 \
             RETURNING {POST_COLUMNS}"
        );
        let after = sqlx::query_as::<_, PostRow>(&update)
            .bind(id)
            .bind(title)
            .bind(excerpt)
            .bind(content)
            .bind(read_time)
            .bind(status)
            .bind(image_url)
            .bind(image_public_id)
            .bind(OffsetDateTime::now_utc())
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(PostUpdate {
            before: PostRecord::try_from(before)?,
            after: PostRecord::try_from(after)?,
        })
    }

    async fn delete_post(&self, id: Uuid) -> Result<PostRecord, RepoError> {
        let sql = format!("DELETE FROM posts AS p WHERE p.id = $1 RETURNING {POST_COLUMNS}");
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;

        PostRecord::try_from(row)
    }
}
