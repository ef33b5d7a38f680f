use async_trait::async_trait;
use sqlx::query_as;

use crate::application::pagination::PageRequest;
use crate::application::repos::{
    AuthorDeletion, AuthorsRepo, AuthorsWriteRepo, CreateAuthorParams, RepoError,
    UpdateAuthorParams,
};
use crate::domain::entities::{AuthorId, AuthorRecord};

use super::PostgresRepositories;
use super::util::{limit_offset, map_sqlx_error};

#[derive(Debug, sqlx::FromRow)]
struct AuthorRow {
    id: i64,
    first_name: String,
    last_name: String,
}

impl From<AuthorRow> for AuthorRecord {
    fn from(row: AuthorRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
        }
    }
}

#[async_trait]
impl AuthorsRepo for PostgresRepositories {
    async fn list_authors(&self, page: PageRequest) -> Result<Vec<AuthorRecord>, RepoError> {
        let (limit, offset) = limit_offset(page);
        let rows = query_as::<_, AuthorRow>(
            r#"
            SELECT id, first_name, last_name
            FROM authors
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(AuthorRecord::from).collect())
    }

    async fn find_author(&self, id: AuthorId) -> Result<Option<AuthorRecord>, RepoError> {
        let row = query_as::<_, AuthorRow>(
            "SELECT id, first_name, last_name FROM authors WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(AuthorRecord::from))
    }
}

#[async_trait]
impl AuthorsWriteRepo for PostgresRepositories {
    async fn create_author(&self, params: CreateAuthorParams) -> Result<AuthorRecord, RepoError> {
        let row = query_as::<_, AuthorRow>(
            r#"
            INSERT INTO authors (first_name, last_name)
            VALUES ($1, $2)
            RETURNING id, first_name, last_name
            "#,
        )
        .bind(params.first_name)
        .bind(params.last_name)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_author(&self, params: UpdateAuthorParams) -> Result<AuthorRecord, RepoError> {
        let row = query_as::<_, AuthorRow>(
            r#"
            UPDATE authors
            SET first_name = $2, last_name = $3
            WHERE id = $1
            RETURNING id, first_name, last_name
            "#,
        )
        .bind(params.id)
        .bind(params.first_name)
        .bind(params.last_name)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(AuthorRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_author(&self, id: AuthorId) -> Result<AuthorDeletion, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        // Delete the books explicitly so the cascade can be counted.
        let cascaded = sqlx::query("DELETE FROM books WHERE author_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();

        let removed = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();

        if removed == 0 {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Err(RepoError::NotFound);
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(AuthorDeletion {
            cascaded_books: cascaded,
        })
    }
}
