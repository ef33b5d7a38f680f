//! Book resource service.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, instrument};

use crate::application::access::{Action, Caller, Resource, authorize};
use crate::application::authors::Created;
use crate::application::codec::{self, ApiVersion, AuthorRef};
use crate::application::error::ResourceError;
use crate::application::pagination::PageRequest;
use crate::application::repos::{
    AuthorAssignment, BooksRepo, BooksWriteRepo, CreateBookParams, UpdateBookParams,
};
use crate::cache::{CacheKey, CacheTag, ListingOperation, PaginationCache};
use crate::domain::entities::BookId;
use crate::domain::validation::BookDraft;

const RESOURCE: &str = "book";

#[derive(Clone)]
pub struct BookService {
    reader: Arc<dyn BooksRepo>,
    writer: Arc<dyn BooksWriteRepo>,
    cache: Arc<PaginationCache>,
}

impl BookService {
    pub fn new(
        reader: Arc<dyn BooksRepo>,
        writer: Arc<dyn BooksWriteRepo>,
        cache: Arc<PaginationCache>,
    ) -> Self {
        Self {
            reader,
            writer,
            cache,
        }
    }

    /// One page of books in the shape of `version`.
    ///
    /// The version is part of the cache key; pages of different shapes never
    /// share an entry.
    pub async fn list(
        &self,
        page: PageRequest,
        version: ApiVersion,
    ) -> Result<Bytes, ResourceError> {
        let key = CacheKey::listing(ListingOperation::BookList, page.page, page.limit)
            .with_version(version);
        self.cache
            .get_or_compute(&key, &[CacheTag::Books], || async {
                let books = self.reader.list_books(page).await?;
                Ok(codec::encode_books(&books, version)?)
            })
            .await
    }

    pub async fn get(&self, id: BookId, version: ApiVersion) -> Result<Bytes, ResourceError> {
        let book = self
            .reader
            .find_book(id)
            .await?
            .ok_or_else(|| ResourceError::not_found(RESOURCE))?;
        Ok(codec::encode_book(&book, version)?)
    }

    /// Persist a new book. An `idAuthor` naming no existing author is stored
    /// as a null reference rather than rejected.
    #[instrument(skip(self, caller, body), fields(caller = %caller))]
    pub async fn create(
        &self,
        caller: &Caller,
        body: &[u8],
        version: ApiVersion,
    ) -> Result<Created, ResourceError> {
        authorize(caller, Resource::Book, Action::Create)?;

        let payload = codec::decode_book(body)?;
        let draft = BookDraft {
            title: payload.title,
            cover_text: payload.cover_text,
            comment: payload.comment,
            author_id: match payload.author {
                AuthorRef::Id(id) => Some(id),
                AuthorRef::Absent | AuthorRef::Null => None,
            },
        };
        draft.validate()?;

        let book = self
            .writer
            .create_book(CreateBookParams {
                title: draft.title,
                cover_text: draft.cover_text,
                comment: draft.comment,
                author_id: draft.author_id,
            })
            .await?;
        self.cache.invalidate_tags(&[CacheTag::Books]);

        info!(
            book_id = book.id,
            author_id = book.author_id(),
            "book created"
        );
        Ok(Created {
            id: book.id,
            location: codec::book_path(book.id),
            body: codec::encode_book(&book, version)?,
        })
    }

    /// Replace title and cover text. The librarian comment is kept; the author
    /// reference is kept when `idAuthor` is absent.
    #[instrument(skip(self, caller, body), fields(caller = %caller))]
    pub async fn update(
        &self,
        caller: &Caller,
        id: BookId,
        body: &[u8],
    ) -> Result<(), ResourceError> {
        authorize(caller, Resource::Book, Action::Update)?;

        let current = self
            .reader
            .find_book(id)
            .await?
            .ok_or_else(|| ResourceError::not_found(RESOURCE))?;

        let payload = codec::decode_book(body)?;
        let draft = BookDraft {
            title: payload.title,
            cover_text: payload.cover_text,
            comment: current.comment,
            author_id: current.author.as_ref().map(|author| author.id),
        };
        draft.validate()?;

        let author = match payload.author {
            AuthorRef::Absent => AuthorAssignment::Keep,
            AuthorRef::Null => AuthorAssignment::Clear,
            AuthorRef::Id(author_id) => AuthorAssignment::Link(author_id),
        };

        let book = self
            .writer
            .update_book(UpdateBookParams {
                id: current.id,
                title: draft.title,
                cover_text: draft.cover_text,
                author,
            })
            .await
            .map_err(|err| ResourceError::from_repo(RESOURCE, err))?;
        self.cache.invalidate_tags(&[CacheTag::Books]);

        info!(book_id = id, author_id = book.author_id(), "book updated");
        Ok(())
    }

    #[instrument(skip(self, caller), fields(caller = %caller))]
    pub async fn delete(&self, caller: &Caller, id: BookId) -> Result<(), ResourceError> {
        authorize(caller, Resource::Book, Action::Delete)?;

        self.writer
            .delete_book(id)
            .await
            .map_err(|err| ResourceError::from_repo(RESOURCE, err))?;
        self.cache.invalidate_tags(&[CacheTag::Books]);

        info!(book_id = id, "book deleted");
        Ok(())
    }
}
