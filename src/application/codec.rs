//! Wire representation of authors and books.
//!
//! Two serialization groups exist. `getAuthors` exposes an author's id and
//! names. `getBooks` exposes a book's id, title and cover text together with
//! its author in the same shape; the librarian comment belongs to no group.
//! From API version 2.0 on, every book also carries a `_links.self` href.
//!
//! Decoding goes through [`serde_json::Value`] with an explicit field schema
//! so that every type mismatch is reported, not only the first.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::entities::{AuthorId, AuthorRecord, BookId, BookRecord};
use crate::domain::validation::Violations;

#[derive(Debug, Error)]
#[error("failed to encode response body: {0}")]
pub struct CodecError(#[from] serde_json::Error);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ApiVersion {
    #[default]
    V1,
    V2,
}

impl ApiVersion {
    pub const ALL: [ApiVersion; 2] = [ApiVersion::V1, ApiVersion::V2];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "1.0",
            Self::V2 => "2.0",
        }
    }

    /// Pick the version requested by an `Accept` header such as
    /// `application/json; version=2.0`. Missing or unknown values fall back.
    pub fn negotiate(accept: Option<&str>, fallback: ApiVersion) -> ApiVersion {
        accept
            .into_iter()
            .flat_map(|header| header.split([',', ';']))
            .filter_map(|param| {
                let (name, value) = param.split_once('=')?;
                if name.trim().eq_ignore_ascii_case("version") {
                    value.trim().trim_matches('"').parse().ok()
                } else {
                    None
                }
            })
            .next()
            .unwrap_or(fallback)
    }

    fn links_books(self) -> bool {
        self >= Self::V2
    }
}

impl Display for ApiVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1.0" | "1" => Ok(Self::V1),
            "2.0" | "2" => Ok(Self::V2),
            other => Err(format!("unsupported api version `{other}`")),
        }
    }
}

/// Path of the single-book resource, used for links and `Location` headers.
pub fn book_path(id: BookId) -> String {
    format!("/api/book/{id}")
}

pub fn author_path(id: AuthorId) -> String {
    format!("/api/author/{id}")
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthorView<'a> {
    id: AuthorId,
    first_name: &'a str,
    last_name: &'a str,
}

impl<'a> From<&'a AuthorRecord> for AuthorView<'a> {
    fn from(author: &'a AuthorRecord) -> Self {
        Self {
            id: author.id,
            first_name: &author.first_name,
            last_name: &author.last_name,
        }
    }
}

#[derive(Serialize)]
struct Link {
    href: String,
}

#[derive(Serialize)]
struct BookLinks {
    #[serde(rename = "self")]
    self_link: Link,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BookView<'a> {
    id: BookId,
    title: &'a str,
    cover_text: &'a str,
    author: Option<AuthorView<'a>>,
    #[serde(rename = "_links", skip_serializing_if = "Option::is_none")]
    links: Option<BookLinks>,
}

impl<'a> BookView<'a> {
    fn new(book: &'a BookRecord, version: ApiVersion) -> Self {
        let links = version.links_books().then(|| BookLinks {
            self_link: Link {
                href: book_path(book.id),
            },
        });

        Self {
            id: book.id,
            title: &book.title,
            cover_text: &book.cover_text,
            author: book.author.as_ref().map(AuthorView::from),
            links,
        }
    }
}

pub fn encode_author(author: &AuthorRecord) -> Result<Bytes, CodecError> {
    Ok(serde_json::to_vec(&AuthorView::from(author))?.into())
}

pub fn encode_authors(authors: &[AuthorRecord]) -> Result<Bytes, CodecError> {
    let views: Vec<AuthorView<'_>> = authors.iter().map(AuthorView::from).collect();
    Ok(serde_json::to_vec(&views)?.into())
}

pub fn encode_book(book: &BookRecord, version: ApiVersion) -> Result<Bytes, CodecError> {
    Ok(serde_json::to_vec(&BookView::new(book, version))?.into())
}

pub fn encode_books(books: &[BookRecord], version: ApiVersion) -> Result<Bytes, CodecError> {
    let views: Vec<BookView<'_>> = books
        .iter()
        .map(|book| BookView::new(book, version))
        .collect();
    Ok(serde_json::to_vec(&views)?.into())
}

/// Decoded author write payload. Missing names decode as empty strings and
/// are rejected later by validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorPayload {
    pub first_name: String,
    pub last_name: String,
}

/// The `idAuthor` member of a book payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorRef {
    Absent,
    Null,
    Id(AuthorId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookPayload {
    pub title: String,
    pub cover_text: String,
    pub comment: String,
    pub author: AuthorRef,
}

pub fn decode_author(body: &[u8]) -> Result<AuthorPayload, Violations> {
    let object = parse_object(body)?;
    let mut violations = Violations::new();

    let first_name = string_field(&object, "firstName", &mut violations);
    let last_name = string_field(&object, "lastName", &mut violations);

    violations.into_result()?;
    Ok(AuthorPayload {
        first_name,
        last_name,
    })
}

pub fn decode_book(body: &[u8]) -> Result<BookPayload, Violations> {
    let object = parse_object(body)?;
    let mut violations = Violations::new();

    let title = string_field(&object, "title", &mut violations);
    let cover_text = string_field(&object, "coverText", &mut violations);
    let comment = string_field(&object, "comment", &mut violations);
    let author = match object.get("idAuthor") {
        None => AuthorRef::Absent,
        Some(Value::Null) => AuthorRef::Null,
        Some(value) => match value.as_i64() {
            Some(id) => AuthorRef::Id(id),
            None => {
                violations.push("idAuthor", "This value should be of type integer.");
                AuthorRef::Absent
            }
        },
    };

    violations.into_result()?;
    Ok(BookPayload {
        title,
        cover_text,
        comment,
        author,
    })
}

fn parse_object(body: &[u8]) -> Result<Map<String, Value>, Violations> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err(Violations::single(
            "body",
            "The request body must be a JSON object.",
        )),
        Err(err) => Err(Violations::single("body", format!("Malformed JSON: {err}"))),
    }
}

fn string_field(object: &Map<String, Value>, field: &'static str, violations: &mut Violations) -> String {
    match object.get(field) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(value)) => value.clone(),
        Some(_) => {
            violations.push(field, "This value should be of type string.");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn author() -> AuthorRecord {
        AuthorRecord {
            id: 4,
            first_name: "Mary".to_string(),
            last_name: "Shelley".to_string(),
        }
    }

    fn book(author: Option<AuthorRecord>) -> BookRecord {
        BookRecord {
            id: 7,
            title: "Frankenstein".to_string(),
            cover_text: "A modern Prometheus".to_string(),
            comment: "shelf B3".to_string(),
            author,
        }
    }

    fn as_json(bytes: Bytes) -> Value {
        serde_json::from_slice(&bytes).expect("codec output is JSON")
    }

    #[test]
    fn authors_group_exposes_id_and_names() {
        let json = as_json(encode_authors(&[author()]).unwrap());
        assert_eq!(
            json,
            json!([{ "id": 4, "firstName": "Mary", "lastName": "Shelley" }])
        );
    }

    #[test]
    fn book_never_exposes_librarian_comment() {
        for version in ApiVersion::ALL {
            let json = as_json(encode_book(&book(Some(author())), version).unwrap());
            assert!(json.get("comment").is_none());
            assert_eq!(json["author"]["firstName"], "Mary");
        }
    }

    #[test]
    fn version_two_adds_self_link() {
        let v1 = as_json(encode_book(&book(None), ApiVersion::V1).unwrap());
        let v2 = as_json(encode_book(&book(None), ApiVersion::V2).unwrap());

        assert!(v1.get("_links").is_none());
        assert_eq!(v2["_links"]["self"]["href"], "/api/book/7");
        assert_eq!(v2["author"], Value::Null);
    }

    #[test]
    fn negotiate_reads_version_parameter() {
        let fallback = ApiVersion::V1;
        assert_eq!(
            ApiVersion::negotiate(Some("application/json; version=2.0"), fallback),
            ApiVersion::V2
        );
        assert_eq!(ApiVersion::negotiate(Some("application/json"), fallback), fallback);
        assert_eq!(
            ApiVersion::negotiate(Some("application/json; version=9.9"), fallback),
            fallback
        );
        assert_eq!(ApiVersion::negotiate(None, ApiVersion::V2), ApiVersion::V2);
    }

    #[test]
    fn decode_author_reads_camel_case_fields() {
        let payload = decode_author(br#"{"firstName":"Mary","lastName":"Shelley"}"#).unwrap();
        assert_eq!(payload.first_name, "Mary");
        assert_eq!(payload.last_name, "Shelley");
    }

    #[test]
    fn decode_author_reports_every_type_mismatch() {
        let violations = decode_author(br#"{"firstName":1,"lastName":[]}"#).unwrap_err();
        assert_eq!(violations.len(), 2);
        assert!(violations.has_field("firstName"));
        assert!(violations.has_field("lastName"));
    }

    #[test]
    fn decode_rejects_malformed_and_non_object_bodies() {
        assert!(decode_author(b"{not json").unwrap_err().has_field("body"));
        assert!(decode_book(b"[1,2]").unwrap_err().has_field("body"));
    }

    #[test]
    fn decode_book_distinguishes_author_reference_forms() {
        let absent = decode_book(br#"{"title":"T","coverText":"C"}"#).unwrap();
        assert_eq!(absent.author, AuthorRef::Absent);

        let null = decode_book(br#"{"title":"T","idAuthor":null}"#).unwrap();
        assert_eq!(null.author, AuthorRef::Null);

        let id = decode_book(br#"{"title":"T","idAuthor":999}"#).unwrap();
        assert_eq!(id.author, AuthorRef::Id(999));

        let bad = decode_book(br#"{"title":"T","idAuthor":"x"}"#).unwrap_err();
        assert!(bad.has_field("idAuthor"));
    }
}
