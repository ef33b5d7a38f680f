//! Pagination cache for the listing endpoints.
//!
//! Serialized pages of `GET /api/authors` and `GET /api/books` are cached
//! under keys derived from the operation, page and limit, and filed under a
//! per-resource tag. Every successful write invalidates the tags it affects.
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `bookapi.toml`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! capacity = 1024
//! ttl_seconds = 300
//! single_flight = true
//! ```

mod config;
mod flight;
mod keys;
mod lock;
mod store;

pub use config::CacheConfig;
pub use keys::{CacheKey, CacheTag, ListingOperation};
pub use store::PaginationCache;
