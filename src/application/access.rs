//! Caller identity and the role check run before any side effect.

use std::fmt::{self, Display, Formatter};

use uuid::Uuid;

use crate::application::error::ResourceError;
use crate::domain::api_keys::ApiRole;

/// An authenticated API key holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiPrincipal {
    pub key_id: Uuid,
    pub name: String,
    pub prefix: String,
    pub role: ApiRole,
}

/// Whoever issued the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Caller {
    #[default]
    Anonymous,
    Key(ApiPrincipal),
}

impl Caller {
    pub fn holds(&self, role: ApiRole) -> bool {
        match self {
            Self::Anonymous => false,
            Self::Key(principal) => principal.role.grants(role),
        }
    }
}

impl Display for Caller {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("anonymous"),
            Self::Key(principal) => write!(f, "key:{}", principal.prefix),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Author,
    Book,
}

impl Resource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Author => "author",
            Self::Book => "book",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl Action {
    fn verb(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Mutations require the admin role. Anonymous callers are told to
/// authenticate; authenticated callers without the role are refused.
pub fn authorize(caller: &Caller, resource: Resource, action: Action) -> Result<(), ResourceError> {
    match caller {
        _ if caller.holds(ApiRole::Admin) => Ok(()),
        Caller::Anonymous => Err(ResourceError::Unauthenticated),
        Caller::Key(_) => Err(ResourceError::forbidden(format!(
            "You do not have sufficient rights to {} {} {}",
            action.verb(),
            article(resource),
            resource.as_str()
        ))),
    }
}

fn article(resource: Resource) -> &'static str {
    match resource {
        Resource::Author => "an",
        Resource::Book => "a",
    }
}
