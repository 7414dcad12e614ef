use async_trait::async_trait;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::application::repos::{PostListScope, PostsRepo, RepoError};
use crate::domain::entities::PostWithAuthor;

use super::super::{PostgresRepositories, map_sqlx_error};
use super::types::{POST_COLUMNS, PostWithAuthorRow};

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_posts(&self, scope: PostListScope) -> Result<Vec<PostWithAuthor>, RepoError> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(POST_COLUMNS);
        qb.push(
            ", a.name AS author_name, a.image AS author_image \
             FROM posts p INNER JOIN authors a ON a.id = p.author_id WHERE 1=1 ",
        );
        Self::apply_scope_conditions(&mut qb, scope);
        qb.push(" ORDER BY p.created_at DESC, p.id DESC");

        let rows = qb
            .build_query_as::<PostWithAuthorRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(PostWithAuthor::try_from).collect()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostWithAuthor>, RepoError> {
        let sql = format!(
            "SELECT {POST_COLUMNS}, a.name AS author_name, a.image AS author_image \
             FROM posts p INNER JOIN authors a ON a.id = p.author_id \
             WHERE p.id = $1"
        );
        let row = sqlx::query_as::<_, PostWithAuthorRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(PostWithAuthor::try_from).transpose()
    }
}
