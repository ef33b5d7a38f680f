//! Author resource service.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, instrument};

use crate::application::access::{Action, Caller, Resource, authorize};
use crate::application::codec;
use crate::application::error::ResourceError;
use crate::application::pagination::PageRequest;
use crate::application::repos::{
    AuthorDeletion, AuthorsRepo, AuthorsWriteRepo, CreateAuthorParams, UpdateAuthorParams,
};
use crate::cache::{CacheKey, CacheTag, ListingOperation, PaginationCache};
use crate::domain::entities::AuthorId;
use crate::domain::validation::AuthorDraft;

const RESOURCE: &str = "author";

/// A freshly persisted entity and its encoded representation.
#[derive(Debug, Clone)]
pub struct Created {
    pub id: i64,
    pub location: String,
    pub body: Bytes,
}

#[derive(Clone)]
pub struct AuthorService {
    reader: Arc<dyn AuthorsRepo>,
    writer: Arc<dyn AuthorsWriteRepo>,
    cache: Arc<PaginationCache>,
}

impl AuthorService {
    pub fn new(
        reader: Arc<dyn AuthorsRepo>,
        writer: Arc<dyn AuthorsWriteRepo>,
        cache: Arc<PaginationCache>,
    ) -> Self {
        Self {
            reader,
            writer,
            cache,
        }
    }

    /// One page of authors, served from the pagination cache when possible.
    pub async fn list(&self, page: PageRequest) -> Result<Bytes, ResourceError> {
        let key = CacheKey::listing(ListingOperation::AllAuthors, page.page, page.limit);
        self.cache
            .get_or_compute(&key, &[CacheTag::Authors], || async {
                let authors = self.reader.list_authors(page).await?;
                Ok(codec::encode_authors(&authors)?)
            })
            .await
    }

    pub async fn get(&self, id: AuthorId) -> Result<Bytes, ResourceError> {
        let author = self
            .reader
            .find_author(id)
            .await?
            .ok_or_else(|| ResourceError::not_found(RESOURCE))?;
        Ok(codec::encode_author(&author)?)
    }

    #[instrument(skip(self, caller, body), fields(caller = %caller))]
    pub async fn create(&self, caller: &Caller, body: &[u8]) -> Result<Created, ResourceError> {
        authorize(caller, Resource::Author, Action::Create)?;

        let payload = codec::decode_author(body)?;
        let draft = AuthorDraft {
            first_name: payload.first_name,
            last_name: payload.last_name,
        };
        draft.validate()?;

        let author = self
            .writer
            .create_author(CreateAuthorParams {
                first_name: draft.first_name,
                last_name: draft.last_name,
            })
            .await?;
        self.cache.invalidate_tags(&[CacheTag::Authors]);

        info!(author_id = author.id, "author created");
        Ok(Created {
            id: author.id,
            location: codec::author_path(author.id),
            body: codec::encode_author(&author)?,
        })
    }

    #[instrument(skip(self, caller, body), fields(caller = %caller))]
    pub async fn update(
        &self,
        caller: &Caller,
        id: AuthorId,
        body: &[u8],
    ) -> Result<(), ResourceError> {
        authorize(caller, Resource::Author, Action::Update)?;

        let current = self
            .reader
            .find_author(id)
            .await?
            .ok_or_else(|| ResourceError::not_found(RESOURCE))?;

        // Only the names are taken from the payload; the id stays the stored one.
        let payload = codec::decode_author(body)?;
        let draft = AuthorDraft {
            first_name: payload.first_name,
            last_name: payload.last_name,
        };
        draft.validate()?;

        self.writer
            .update_author(UpdateAuthorParams {
                id: current.id,
                first_name: draft.first_name,
                last_name: draft.last_name,
            })
            .await
            .map_err(|err| ResourceError::from_repo(RESOURCE, err))?;
        self.cache.invalidate_tags(&[CacheTag::Authors]);

        info!(author_id = id, "author updated");
        Ok(())
    }

    /// Remove an author and, through the store's cascade rule, its books.
    #[instrument(skip(self, caller), fields(caller = %caller))]
    pub async fn delete(
        &self,
        caller: &Caller,
        id: AuthorId,
    ) -> Result<AuthorDeletion, ResourceError> {
        authorize(caller, Resource::Author, Action::Delete)?;

        let deletion = self
            .writer
            .delete_author(id)
            .await
            .map_err(|err| ResourceError::from_repo(RESOURCE, err))?;

        if deletion.cascaded_books > 0 {
            self.cache
                .invalidate_tags(&[CacheTag::Authors, CacheTag::Books]);
        } else {
            self.cache.invalidate_tags(&[CacheTag::Authors]);
        }

        info!(
            author_id = id,
            cascaded_books = deletion.cascaded_books,
            "author deleted"
        );
        Ok(deletion)
    }
}
