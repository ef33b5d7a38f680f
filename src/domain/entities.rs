//! Domain entities mirrored from persistent storage.
//!
//! Books hold the only strong reference (`author`); an author's books are a
//! derived back-reference resolved by the store, never owned by the record.

pub type AuthorId = i64;
pub type BookId = i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorRecord {
    pub id: AuthorId,
    pub first_name: String,
    pub last_name: String,
}

/// A book joined with the author row its foreign key points at, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRecord {
    pub id: BookId,
    pub title: String,
    pub cover_text: String,
    /// Librarian-only note. Never leaves the process through the codec.
    pub comment: String,
    pub author: Option<AuthorRecord>,
}

impl BookRecord {
    pub fn author_id(&self) -> Option<AuthorId> {
        self.author.as_ref().map(|author| author.id)
    }
}
