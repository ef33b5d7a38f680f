//! Authors and books REST API with a tag-invalidated pagination cache.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
