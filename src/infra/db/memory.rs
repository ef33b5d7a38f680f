//! In-process store used when no database is configured, and by tests.
//!
//! Rows live in ordered maps keyed by id. Books carry an explicit
//! `author_id` foreign key; deleting an author removes every book pointing at
//! it, the same rule the Postgres schema enforces with `ON DELETE CASCADE`.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::application::repos::{
    ApiKeysRepo, AuthorAssignment, AuthorDeletion, AuthorsRepo, AuthorsWriteRepo, BooksRepo,
    BooksWriteRepo, CreateApiKeyParams, CreateAuthorParams, CreateBookParams, RepoError,
    StoreHealth, UpdateAuthorParams, UpdateBookParams,
};
use crate::domain::api_keys::ApiKeyRecord;
use crate::domain::entities::{AuthorId, AuthorRecord, BookId, BookRecord};

#[derive(Debug, Clone)]
struct AuthorRow {
    first_name: String,
    last_name: String,
}

#[derive(Debug, Clone)]
struct BookRow {
    title: String,
    cover_text: String,
    comment: String,
    author_id: Option<AuthorId>,
}

#[derive(Debug, Default)]
struct MemoryState {
    last_author_id: AuthorId,
    last_book_id: BookId,
    authors: BTreeMap<AuthorId, AuthorRow>,
    books: BTreeMap<BookId, BookRow>,
    api_keys: BTreeMap<Uuid, ApiKeyRecord>,
}

impl MemoryState {
    fn author(&self, id: AuthorId) -> Option<AuthorRecord> {
        self.authors.get(&id).map(|row| AuthorRecord {
            id,
            first_name: row.first_name.clone(),
            last_name: row.last_name.clone(),
        })
    }

    fn book(&self, id: BookId) -> Option<BookRecord> {
        self.books.get(&id).map(|row| BookRecord {
            id,
            title: row.title.clone(),
            cover_text: row.cover_text.clone(),
            comment: row.comment.clone(),
            author: row.author_id.and_then(|author_id| self.author(author_id)),
        })
    }

    /// Keep the reference only if it names an existing author.
    fn resolve_author(&self, id: Option<AuthorId>) -> Option<AuthorId> {
        id.filter(|id| self.authors.contains_key(id))
    }
}

fn window<K, V>(map: &BTreeMap<K, V>, page: PageRequest) -> impl Iterator<Item = &K> {
    let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    map.keys().skip(skip).take(page.limit as usize)
}

#[derive(Debug, Default)]
pub struct MemoryRepositories {
    state: RwLock<MemoryState>,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl AuthorsRepo for MemoryRepositories {
    async fn list_authors(&self, page: PageRequest) -> Result<Vec<AuthorRecord>, RepoError> {
        let state = self.read();
        Ok(window(&state.authors, page)
            .filter_map(|id| state.author(*id))
            .collect())
    }

    async fn find_author(&self, id: AuthorId) -> Result<Option<AuthorRecord>, RepoError> {
        Ok(self.read().author(id))
    }
}

#[async_trait]
impl AuthorsWriteRepo for MemoryRepositories {
    async fn create_author(&self, params: CreateAuthorParams) -> Result<AuthorRecord, RepoError> {
        let mut state = self.write();
        state.last_author_id += 1;
        let id = state.last_author_id;
        state.authors.insert(
            id,
            AuthorRow {
                first_name: params.first_name,
                last_name: params.last_name,
            },
        );
        state.author(id).ok_or(RepoError::NotFound)
    }

    async fn update_author(&self, params: UpdateAuthorParams) -> Result<AuthorRecord, RepoError> {
        let mut state = self.write();
        let row = state.authors.get_mut(&params.id).ok_or(RepoError::NotFound)?;
        row.first_name = params.first_name;
        row.last_name = params.last_name;
        state.author(params.id).ok_or(RepoError::NotFound)
    }

    async fn delete_author(&self, id: AuthorId) -> Result<AuthorDeletion, RepoError> {
        let mut state = self.write();
        state.authors.remove(&id).ok_or(RepoError::NotFound)?;

        let before = state.books.len();
        state.books.retain(|_, book| book.author_id != Some(id));
        let cascaded_books = (before - state.books.len()) as u64;

        Ok(AuthorDeletion { cascaded_books })
    }
}

#[async_trait]
impl BooksRepo for MemoryRepositories {
    async fn list_books(&self, page: PageRequest) -> Result<Vec<BookRecord>, RepoError> {
        let state = self.read();
        Ok(window(&state.books, page)
            .filter_map(|id| state.book(*id))
            .collect())
    }

    async fn find_book(&self, id: BookId) -> Result<Option<BookRecord>, RepoError> {
        Ok(self.read().book(id))
    }
}

#[async_trait]
impl BooksWriteRepo for MemoryRepositories {
    async fn create_book(&self, params: CreateBookParams) -> Result<BookRecord, RepoError> {
        let mut state = self.write();
        let author_id = state.resolve_author(params.author_id);
        state.last_book_id += 1;
        let id = state.last_book_id;
        state.books.insert(
            id,
            BookRow {
                title: params.title,
                cover_text: params.cover_text,
                comment: params.comment,
                author_id,
            },
        );
        state.book(id).ok_or(RepoError::NotFound)
    }

    async fn update_book(&self, params: UpdateBookParams) -> Result<BookRecord, RepoError> {
        let mut state = self.write();
        let author_id = match params.author {
            AuthorAssignment::Keep => state
                .books
                .get(&params.id)
                .ok_or(RepoError::NotFound)?
                .author_id,
            AuthorAssignment::Clear => None,
            AuthorAssignment::Link(id) => state.resolve_author(Some(id)),
        };

        let row = state.books.get_mut(&params.id).ok_or(RepoError::NotFound)?;
        row.title = params.title;
        row.cover_text = params.cover_text;
        row.author_id = author_id;
        state.book(params.id).ok_or(RepoError::NotFound)
    }

    async fn delete_book(&self, id: BookId) -> Result<(), RepoError> {
        self.write()
            .books
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl ApiKeysRepo for MemoryRepositories {
    async fn create_key(&self, params: CreateApiKeyParams) -> Result<ApiKeyRecord, RepoError> {
        let mut state = self.write();
        if state.api_keys.values().any(|key| key.prefix == params.prefix) {
            return Err(RepoError::Duplicate {
                constraint: "api_keys_prefix_key".to_string(),
            });
        }

        let record = ApiKeyRecord {
            id: Uuid::new_v4(),
            name: params.name,
            prefix: params.prefix,
            hashed_secret: params.hashed_secret,
            role: params.role,
            expires_at: params.expires_at,
            revoked_at: None,
            last_used_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        state.api_keys.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<ApiKeyRecord>, RepoError> {
        Ok(self
            .read()
            .api_keys
            .values()
            .find(|key| key.prefix == prefix)
            .cloned())
    }

    async fn revoke_key(&self, id: Uuid, revoked_at: OffsetDateTime) -> Result<(), RepoError> {
        let mut state = self.write();
        let key = state.api_keys.get_mut(&id).ok_or(RepoError::NotFound)?;
        if key.revoked_at.is_none() {
            key.revoked_at = Some(revoked_at);
        }
        Ok(())
    }

    async fn update_last_used(&self, id: Uuid, used_at: OffsetDateTime) -> Result<(), RepoError> {
        if let Some(key) = self.write().api_keys.get_mut(&id) {
            key.last_used_at = Some(used_at);
        }
        Ok(())
    }
}

#[async_trait]
impl StoreHealth for MemoryRepositories {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn author(repos: &MemoryRepositories, n: u32) -> AuthorRecord {
        repos
            .create_author(CreateAuthorParams {
                first_name: format!("First {n}"),
                last_name: format!("Last {n}"),
            })
            .await
            .unwrap()
    }

    async fn book(repos: &MemoryRepositories, title: &str, author_id: Option<AuthorId>) -> BookRecord {
        repos
            .create_book(CreateBookParams {
                title: title.to_string(),
                cover_text: String::new(),
                comment: "internal".to_string(),
                author_id,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn pages_follow_insertion_order() {
        let repos = MemoryRepositories::new();
        for n in 0..7 {
            author(&repos, n).await;
        }

        let second = repos.list_authors(PageRequest::new(2, 3)).await.unwrap();
        let names: Vec<_> = second.iter().map(|a| a.first_name.as_str()).collect();
        assert_eq!(names, ["First 3", "First 4", "First 5"]);

        let past_end = repos.list_authors(PageRequest::new(4, 3)).await.unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn unresolved_author_is_stored_as_null() {
        let repos = MemoryRepositories::new();
        let created = book(&repos, "Orphan", Some(999)).await;
        assert!(created.author.is_none());
    }

    #[tokio::test]
    async fn deleting_an_author_cascades_to_its_books() {
        let repos = MemoryRepositories::new();
        let kept = author(&repos, 1).await;
        let removed = author(&repos, 2).await;
        book(&repos, "A", Some(removed.id)).await;
        book(&repos, "B", Some(removed.id)).await;
        let survivor = book(&repos, "C", Some(kept.id)).await;

        let deletion = repos.delete_author(removed.id).await.unwrap();
        assert_eq!(deletion.cascaded_books, 2);

        let remaining = repos.list_books(PageRequest::new(1, 10)).await.unwrap();
        assert_eq!(remaining, vec![survivor]);
        assert!(matches!(
            repos.delete_author(removed.id).await,
            Err(RepoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn update_applies_author_assignment() {
        let repos = MemoryRepositories::new();
        let first = author(&repos, 1).await;
        let created = book(&repos, "A", Some(first.id)).await;

        let update = |author| UpdateBookParams {
            id: created.id,
            title: "A2".to_string(),
            cover_text: "cover".to_string(),
            author,
        };

        let kept = repos.update_book(update(AuthorAssignment::Keep)).await.unwrap();
        assert_eq!(kept.author_id(), Some(first.id));
        assert_eq!(kept.comment, "internal");

        let dangling = repos.update_book(update(AuthorAssignment::Link(42))).await.unwrap();
        assert_eq!(dangling.author_id(), None);

        let relinked = repos
            .update_book(update(AuthorAssignment::Link(first.id)))
            .await
            .unwrap();
        assert_eq!(relinked.author_id(), Some(first.id));

        let cleared = repos.update_book(update(AuthorAssignment::Clear)).await.unwrap();
        assert_eq!(cleared.author_id(), None);
    }

    #[tokio::test]
    async fn missing_rows_report_not_found() {
        let repos = MemoryRepositories::new();
        assert!(matches!(repos.delete_book(1).await, Err(RepoError::NotFound)));
        let result = repos
            .update_author(UpdateAuthorParams {
                id: 1,
                first_name: "x".to_string(),
                last_name: "y".to_string(),
            })
            .await;
        assert!(matches!(result, Err(RepoError::NotFound)));
    }
}
