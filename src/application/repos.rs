//! Repository traits describing persistence adapters.
//!
//! Reads and writes are split so services can be handed a read-only view
//! where they never mutate.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::domain::api_keys::{ApiKeyRecord, ApiRole};
use crate::domain::entities::{AuthorId, AuthorRecord, BookId, BookRecord};

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

#[derive(Debug, Clone)]
pub struct CreateAuthorParams {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone)]
pub struct UpdateAuthorParams {
    pub id: AuthorId,
    pub first_name: String,
    pub last_name: String,
}

/// Outcome of removing an author together with the books that referenced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorDeletion {
    pub cascaded_books: u64,
}

#[derive(Debug, Clone)]
pub struct CreateBookParams {
    pub title: String,
    pub cover_text: String,
    pub comment: String,
    /// Stored as `NULL` when the id does not name an existing author.
    pub author_id: Option<AuthorId>,
}

/// How an update treats the book's author reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorAssignment {
    Keep,
    Clear,
    /// Point at this author, or at nobody if it does not exist.
    Link(AuthorId),
}

#[derive(Debug, Clone)]
pub struct UpdateBookParams {
    pub id: BookId,
    pub title: String,
    pub cover_text: String,
    pub author: AuthorAssignment,
}

#[async_trait]
pub trait AuthorsRepo: Send + Sync {
    async fn list_authors(&self, page: PageRequest) -> Result<Vec<AuthorRecord>, RepoError>;

    async fn find_author(&self, id: AuthorId) -> Result<Option<AuthorRecord>, RepoError>;
}

#[async_trait]
pub trait AuthorsWriteRepo: Send + Sync {
    async fn create_author(&self, params: CreateAuthorParams) -> Result<AuthorRecord, RepoError>;

    /// Fails with [`RepoError::NotFound`] when the author does not exist.
    async fn update_author(&self, params: UpdateAuthorParams) -> Result<AuthorRecord, RepoError>;

    /// Removes the author and every book pointing at it.
    async fn delete_author(&self, id: AuthorId) -> Result<AuthorDeletion, RepoError>;
}

#[async_trait]
pub trait BooksRepo: Send + Sync {
    async fn list_books(&self, page: PageRequest) -> Result<Vec<BookRecord>, RepoError>;

    async fn find_book(&self, id: BookId) -> Result<Option<BookRecord>, RepoError>;
}

#[async_trait]
pub trait BooksWriteRepo: Send + Sync {
    async fn create_book(&self, params: CreateBookParams) -> Result<BookRecord, RepoError>;

    async fn update_book(&self, params: UpdateBookParams) -> Result<BookRecord, RepoError>;

    async fn delete_book(&self, id: BookId) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateApiKeyParams {
    pub name: String,
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub role: ApiRole,
    pub expires_at: Option<OffsetDateTime>,
}

#[async_trait]
pub trait ApiKeysRepo: Send + Sync {
    async fn create_key(&self, params: CreateApiKeyParams) -> Result<ApiKeyRecord, RepoError>;

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<ApiKeyRecord>, RepoError>;

    async fn revoke_key(&self, id: Uuid, revoked_at: OffsetDateTime) -> Result<(), RepoError>;

    async fn update_last_used(&self, id: Uuid, used_at: OffsetDateTime) -> Result<(), RepoError>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
