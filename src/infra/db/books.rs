use async_trait::async_trait;
use sqlx::query_as;

use crate::application::pagination::PageRequest;
use crate::application::repos::{
    AuthorAssignment, BooksRepo, BooksWriteRepo, CreateBookParams, RepoError, UpdateBookParams,
};
use crate::domain::entities::{AuthorRecord, BookId, BookRecord};

use super::PostgresRepositories;
use super::util::{limit_offset, map_sqlx_error};

const BOOK_COLUMNS: &str = "b.id, b.title, b.cover_text, b.comment, \
    a.id AS author_id, a.first_name AS author_first_name, a.last_name AS author_last_name";

#[derive(Debug, sqlx::FromRow)]
struct BookRow {
    id: i64,
    title: String,
    cover_text: String,
    comment: String,
    author_id: Option<i64>,
    author_first_name: Option<String>,
    author_last_name: Option<String>,
}

impl From<BookRow> for BookRecord {
    fn from(row: BookRow) -> Self {
        let author = match (row.author_id, row.author_first_name, row.author_last_name) {
            (Some(id), Some(first_name), Some(last_name)) => Some(AuthorRecord {
                id,
                first_name,
                last_name,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            title: row.title,
            cover_text: row.cover_text,
            comment: row.comment,
            author,
        }
    }
}

fn assignment_mode(assignment: AuthorAssignment) -> (&'static str, Option<i64>) {
    match assignment {
        AuthorAssignment::Keep => ("keep", None),
        AuthorAssignment::Clear => ("clear", None),
        AuthorAssignment::Link(id) => ("link", Some(id)),
    }
}

#[async_trait]
impl BooksRepo for PostgresRepositories {
    async fn list_books(&self, page: PageRequest) -> Result<Vec<BookRecord>, RepoError> {
        let (limit, offset) = limit_offset(page);
        let sql = format!(
            "SELECT {BOOK_COLUMNS} FROM books b \
             LEFT JOIN authors a ON a.id = b.author_id \
             ORDER BY b.id LIMIT $1 OFFSET $2"
        );
        let rows = query_as::<_, BookRow>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(BookRecord::from).collect())
    }

    async fn find_book(&self, id: BookId) -> Result<Option<BookRecord>, RepoError> {
        let sql = format!(
            "SELECT {BOOK_COLUMNS} FROM books b \
             LEFT JOIN authors a ON a.id = b.author_id \
             WHERE b.id = $1"
        );
        let row = query_as::<_, BookRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(BookRecord::from))
    }
}

#[async_trait]
impl BooksWriteRepo for PostgresRepositories {
    async fn create_book(&self, params: CreateBookParams) -> Result<BookRecord, RepoError> {
        // The subselect stores NULL when the author id does not resolve.
        let sql = format!(
            "WITH b AS ( \
                INSERT INTO books (title, cover_text, comment, author_id) \
                VALUES ($1, $2, $3, (SELECT id FROM authors WHERE id = $4)) \
                RETURNING id, title, cover_text, comment, author_id \
             ) \
             SELECT {BOOK_COLUMNS} FROM b LEFT JOIN authors a ON a.id = b.author_id"
        );
        let row = query_as::<_, BookRow>(&sql)
            .bind(params.title)
            .bind(params.cover_text)
            .bind(params.comment)
            .bind(params.author_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_book(&self, params: UpdateBookParams) -> Result<BookRecord, RepoError> {
        let (mode, link) = assignment_mode(params.author);
        let sql = format!(
            "WITH b AS ( \
                UPDATE books SET \
                    title = $2, \
                    cover_text = $3, \
                    author_id = CASE $4::text \
                        WHEN 'keep' THEN author_id \
                        WHEN 'clear' THEN NULL \
                        ELSE (SELECT id FROM authors WHERE id = $5) \
                    END \
                WHERE id = $1 \
                RETURNING id, title, cover_text, comment, author_id \
             ) \
             SELECT {BOOK_COLUMNS} FROM b LEFT JOIN authors a ON a.id = b.author_id"
        );
        let row = query_as::<_, BookRow>(&sql)
            .bind(params.id)
            .bind(params.title)
            .bind(params.cover_text)
            .bind(mode)
            .bind(link)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(BookRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_book(&self, id: BookId) -> Result<(), RepoError> {
        let removed = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();

        if removed == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
