//! Cache key derivation and invalidation tags.
//!
//! Keys are plain strings of the form `<operation>-<page>-<limit>`, with an
//! optional `-v<version>` suffix for listings whose payload shape depends on
//! the requested API version.

use std::fmt::{self, Display, Formatter};

/// Label attached to every cached listing of one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTag {
    Authors,
    Books,
}

impl CacheTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authors => "authorsCache",
            Self::Books => "booksCache",
        }
    }
}

impl Display for CacheTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listing operations whose serialized pages are cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingOperation {
    AllAuthors,
    BookList,
}

impl ListingOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AllAuthors => "getAllAuthors",
            Self::BookList => "getBookList",
        }
    }

    /// Tag every page of this listing is filed under.
    pub fn tag(self) -> CacheTag {
        match self {
            Self::AllAuthors => CacheTag::Authors,
            Self::BookList => CacheTag::Books,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for one page of a listing.
    ///
    /// `page` and `limit` are rendered exactly as given; callers that want
    /// `"01"` and `"1"` to share an entry must normalize before calling.
    pub fn listing(operation: ListingOperation, page: impl Display, limit: impl Display) -> Self {
        Self(format!("{}-{}-{}", operation.as_str(), page, limit))
    }

    /// Fold an API version into the key so payloads of different shapes never collide.
    pub fn with_version(self, version: impl Display) -> Self {
        Self(format!("{}-v{}", self.0, version))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_key_matches_wire_format() {
        let key = CacheKey::listing(ListingOperation::AllAuthors, 1, 3);
        assert_eq!(key.as_str(), "getAllAuthors-1-3");

        let key = CacheKey::listing(ListingOperation::BookList, 2, 10);
        assert_eq!(key.as_str(), "getBookList-2-10");
    }

    #[test]
    fn integer_and_string_parameters_render_identically() {
        let from_ints = CacheKey::listing(ListingOperation::BookList, 1u32, 3u32);
        let from_strs = CacheKey::listing(ListingOperation::BookList, "1", "3");
        assert_eq!(from_ints, from_strs);
    }

    #[test]
    fn parameters_are_not_normalized() {
        let padded = CacheKey::listing(ListingOperation::BookList, "01", "3");
        let plain = CacheKey::listing(ListingOperation::BookList, "1", "3");
        assert_ne!(padded, plain);
    }

    #[test]
    fn version_suffix_separates_payload_shapes() {
        let base = CacheKey::listing(ListingOperation::BookList, 1, 3);
        let v1 = base.clone().with_version("1.0");
        let v2 = base.with_version("2.0");
        assert_eq!(v1.as_str(), "getBookList-1-3-v1.0");
        assert_ne!(v1, v2);
    }

    #[test]
    fn operations_map_to_their_kind_tag() {
        assert_eq!(ListingOperation::AllAuthors.tag(), CacheTag::Authors);
        assert_eq!(ListingOperation::BookList.tag(), CacheTag::Books);
        assert_eq!(CacheTag::Authors.to_string(), "authorsCache");
        assert_eq!(CacheTag::Books.to_string(), "booksCache");
    }
}
