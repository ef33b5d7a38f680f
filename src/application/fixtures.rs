//! Demo data for a fresh store.

use tracing::info;

use crate::application::api_keys::{ApiKeyIssued, ApiKeyService, IssueApiKeyCommand};
use crate::application::error::AppError;
use crate::application::repos::{
    AuthorsWriteRepo, BooksWriteRepo, CreateAuthorParams, CreateBookParams,
};
use crate::cache::{CacheTag, PaginationCache};
use crate::domain::api_keys::ApiRole;

pub const AUTHOR_COUNT: usize = 10;
pub const BOOK_COUNT: usize = 20;

#[derive(Debug, Clone)]
pub struct SeedSummary {
    pub authors: usize,
    pub books: usize,
    pub user_key: ApiKeyIssued,
    pub admin_key: ApiKeyIssued,
}

/// Insert the demo authors and books and issue one key per role.
pub async fn seed(
    authors: &dyn AuthorsWriteRepo,
    books: &dyn BooksWriteRepo,
    api_keys: &ApiKeyService,
    cache: &PaginationCache,
) -> Result<SeedSummary, AppError> {
    let mut author_ids = Vec::with_capacity(AUTHOR_COUNT);
    for i in 0..AUTHOR_COUNT {
        let author = authors
            .create_author(CreateAuthorParams {
                first_name: format!("First name {i}"),
                last_name: format!("Last name {i}"),
            })
            .await?;
        author_ids.push(author.id);
    }

    for i in 0..BOOK_COUNT {
        books
            .create_book(CreateBookParams {
                title: format!("Book {i}"),
                cover_text: format!("Back cover number: {i}"),
                comment: format!("Librarian comment {i}"),
                author_id: Some(author_ids[i % AUTHOR_COUNT]),
            })
            .await?;
    }

    cache.invalidate_tags(&[CacheTag::Authors, CacheTag::Books]);

    let user_key = api_keys
        .issue(IssueApiKeyCommand {
            name: "fixtures-user".to_string(),
            role: ApiRole::User,
            expires_at: None,
        })
        .await?;
    let admin_key = api_keys
        .issue(IssueApiKeyCommand {
            name: "fixtures-admin".to_string(),
            role: ApiRole::Admin,
            expires_at: None,
        })
        .await?;

    info!(
        authors = AUTHOR_COUNT,
        books = BOOK_COUNT,
        "fixtures loaded"
    );
    Ok(SeedSummary {
        authors: AUTHOR_COUNT,
        books: BOOK_COUNT,
        user_key,
        admin_key,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::application::pagination::PageRequest;
    use crate::application::repos::{AuthorsRepo, BooksRepo};
    use crate::cache::CacheConfig;
    use crate::infra::db::MemoryRepositories;

    #[tokio::test]
    async fn seed_links_every_book_to_an_author() {
        let repos = Arc::new(MemoryRepositories::new());
        let api_keys = ApiKeyService::new(repos.clone());
        let cache = PaginationCache::new(CacheConfig::default());

        let summary = seed(repos.as_ref(), repos.as_ref(), &api_keys, &cache)
            .await
            .expect("seed should succeed");
        assert_eq!(summary.authors, 10);
        assert_eq!(summary.books, 20);
        assert_eq!(summary.admin_key.record.role, ApiRole::Admin);
        assert_eq!(summary.user_key.record.role, ApiRole::User);

        let authors = repos.list_authors(PageRequest::new(1, 100)).await.unwrap();
        assert_eq!(authors.len(), 10);
        assert_eq!(authors[0].first_name, "First name 0");

        let books = repos.list_books(PageRequest::new(1, 100)).await.unwrap();
        assert_eq!(books.len(), 20);
        assert!(books.iter().all(|book| book.author.is_some()));
        assert_eq!(books[11].cover_text, "Back cover number: 11");
        assert_eq!(books[11].author_id(), Some(authors[1].id));
    }
}
