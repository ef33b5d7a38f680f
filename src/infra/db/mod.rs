//! Store adapters: Postgres via sqlx and an in-process fallback.

mod api_keys;
mod authors;
mod books;
mod memory;
mod util;

pub use memory::MemoryRepositories;
pub use util::map_sqlx_error;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{
    Postgres, Transaction,
    migrate::MigrateError,
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::application::repos::{
    ApiKeysRepo, AuthorsRepo, AuthorsWriteRepo, BooksRepo, BooksWriteRepo, RepoError,
    StoreHealth,
};

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
        sqlx::migrate!("./migrations").run(pool).await
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }
}

#[async_trait]
impl StoreHealth for PostgresRepositories {
    async fn ping(&self) -> Result<(), RepoError> {
        self.health_check().await.map_err(map_sqlx_error)
    }
}

/// Every store capability the services need, behind trait objects.
#[derive(Clone)]
pub struct Stores {
    pub authors: Arc<dyn AuthorsRepo>,
    pub authors_write: Arc<dyn AuthorsWriteRepo>,
    pub books: Arc<dyn BooksRepo>,
    pub books_write: Arc<dyn BooksWriteRepo>,
    pub api_keys: Arc<dyn ApiKeysRepo>,
    pub health: Arc<dyn StoreHealth>,
}

impl Stores {
    /// Share one backend across every capability.
    pub fn from_backend<R>(backend: Arc<R>) -> Self
    where
        R: AuthorsRepo
            + AuthorsWriteRepo
            + BooksRepo
            + BooksWriteRepo
            + ApiKeysRepo
            + StoreHealth
            + 'static,
    {
        Self {
            authors: backend.clone(),
            authors_write: backend.clone(),
            books: backend.clone(),
            books_write: backend.clone(),
            api_keys: backend.clone(),
            health: backend,
        }
    }
}
