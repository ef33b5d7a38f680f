use std::error::Error as StdError;

use axum::{http::StatusCode, response::Response};
use thiserror::Error;

use crate::application::api_keys::ApiKeyError;
use crate::application::codec::CodecError;
use crate::application::repos::RepoError;
use crate::domain::validation::Violations;
use crate::infra::error::InfraError;

/// Diagnostic detail attached to error responses and picked up by the
/// response logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Failures surfaced by the author and book services.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("{message}")]
    Forbidden { message: String },
    #[error("validation failed: {0}")]
    Validation(Violations),
    #[error("{resource} not found")]
    NotFound { resource: &'static str },
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl ResourceError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }

    /// Map a store failure, turning a missing row into a not-found for `resource`.
    pub fn from_repo(resource: &'static str, err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::not_found(resource),
            other => Self::Repo(other),
        }
    }
}

impl From<Violations> for ResourceError {
    fn from(violations: Violations) -> Self {
        Self::Validation(violations)
    }
}

/// Errors raised on the startup and command-line paths.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    ApiKey(#[from] ApiKeyError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
