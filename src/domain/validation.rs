//! Write drafts and the constraints a persisted entity must satisfy.
//!
//! Validation never stops at the first failure: every violated constraint is
//! reported so clients can fix a payload in one round trip.

use std::fmt;

use serde::Serialize;

use super::entities::AuthorId;

pub const MAX_NAME_LEN: usize = 255;
pub const MAX_TITLE_LEN: usize = 255;

/// A single failed constraint, addressed by wire field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut violations = Self::new();
        violations.push(field, message);
        violations
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(Violation {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }

    /// Returns true when at least one violation targets `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|violation| violation.field == field)
    }

    pub fn into_result(self) -> Result<(), Violations> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, violation) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", violation.field, violation.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for Violations {}

/// Mutable scalar fields of an author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorDraft {
    pub first_name: String,
    pub last_name: String,
}

impl AuthorDraft {
    pub fn validate(&self) -> Result<(), Violations> {
        let mut violations = Violations::new();
        require_text(
            &mut violations,
            "firstName",
            &self.first_name,
            MAX_NAME_LEN,
            "The author's first name is required",
        );
        require_text(
            &mut violations,
            "lastName",
            &self.last_name,
            MAX_NAME_LEN,
            "The author's last name is required",
        );
        violations.into_result()
    }
}

/// Mutable scalar fields of a book plus the author it should point at.
///
/// `author_id` is a request, not a guarantee: the store stores `NULL` when the
/// id does not resolve to an existing author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDraft {
    pub title: String,
    pub cover_text: String,
    pub comment: String,
    pub author_id: Option<AuthorId>,
}

impl BookDraft {
    pub fn validate(&self) -> Result<(), Violations> {
        let mut violations = Violations::new();
        require_text(
            &mut violations,
            "title",
            &self.title,
            MAX_TITLE_LEN,
            "The book title is required",
        );
        violations.into_result()
    }
}

fn require_text(
    violations: &mut Violations,
    field: &'static str,
    value: &str,
    max_len: usize,
    blank_message: &'static str,
) {
    if value.trim().is_empty() {
        violations.push(field, blank_message);
    } else if value.chars().count() > max_len {
        violations.push(
            field,
            format!("This value is too long. It should have {max_len} characters or less."),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_reports_every_blank_name() {
        let draft = AuthorDraft {
            first_name: "  ".to_string(),
            last_name: String::new(),
        };

        let violations = draft.validate().expect_err("blank names must fail");
        assert_eq!(violations.len(), 2);
        assert!(violations.has_field("firstName"));
        assert!(violations.has_field("lastName"));
    }

    #[test]
    fn author_with_names_is_valid() {
        let draft = AuthorDraft {
            first_name: "Ursula".to_string(),
            last_name: "Le Guin".to_string(),
        };
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn overlong_title_is_rejected() {
        let draft = BookDraft {
            title: "x".repeat(MAX_TITLE_LEN + 1),
            cover_text: String::new(),
            comment: String::new(),
            author_id: None,
        };

        let violations = draft.validate().expect_err("title is too long");
        assert!(violations.has_field("title"));
        assert!(violations.to_string().contains("255 characters"));
    }

    #[test]
    fn book_accepts_empty_cover_and_missing_author() {
        let draft = BookDraft {
            title: "The Dispossessed".to_string(),
            cover_text: String::new(),
            comment: String::new(),
            author_id: Some(999),
        };
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn violations_serialize_as_field_message_list() {
        let violations = Violations::single("firstName", "required");
        let json = serde_json::to_value(&violations).expect("serializable");
        assert_eq!(
            json,
            serde_json::json!([{ "field": "firstName", "message": "required" }])
        );
    }
}
