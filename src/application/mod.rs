//! Application services layer.

pub mod access;
pub mod api_keys;
pub mod authors;
pub mod books;
pub mod codec;
pub mod error;
pub mod fixtures;
pub mod pagination;
pub mod repos;
