use std::sync::Arc;

use crate::application::api_keys::ApiKeyService;
use crate::application::authors::AuthorService;
use crate::application::books::BookService;
use crate::application::codec::ApiVersion;
use crate::application::pagination::PaginationDefaults;
use crate::application::repos::StoreHealth;
use crate::cache::PaginationCache;
use crate::infra::db::Stores;

#[derive(Clone)]
pub struct ApiState {
    pub authors: AuthorService,
    pub books: BookService,
    pub api_keys: ApiKeyService,
    pub health: Arc<dyn StoreHealth>,
    pub pagination: PaginationDefaults,
    pub default_version: ApiVersion,
    public_url: Option<Arc<str>>,
}

impl ApiState {
    /// Wire the services over `stores`, sharing one pagination cache.
    pub fn new(stores: Stores, cache: Arc<PaginationCache>) -> Self {
        Self {
            authors: AuthorService::new(stores.authors, stores.authors_write, cache.clone()),
            books: BookService::new(stores.books, stores.books_write, cache),
            api_keys: ApiKeyService::new(stores.api_keys),
            health: stores.health,
            pagination: PaginationDefaults::default(),
            default_version: ApiVersion::default(),
            public_url: None,
        }
    }

    pub fn with_pagination(mut self, pagination: PaginationDefaults) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn with_default_version(mut self, version: ApiVersion) -> Self {
        self.default_version = version;
        self
    }

    pub fn with_public_url_opt(mut self, public_url: Option<String>) -> Self {
        self.public_url = public_url.map(Arc::from);
        self
    }

    /// `Location` header value for a resource path.
    pub fn location(&self, path: &str) -> String {
        match self.public_url.as_deref() {
            Some(base) => format!("{base}{path}"),
            None => path.to_string(),
        }
    }
}
