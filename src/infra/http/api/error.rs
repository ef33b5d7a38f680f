use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::api_keys::ApiAuthError;
use crate::application::error::{ErrorReport, ResourceError};
use crate::application::repos::RepoError;
use crate::domain::validation::Violations;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const VALIDATION: &str = "validation_failed";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const FORBIDDEN: &str = "forbidden";
    pub const NOT_FOUND: &str = "not_found";
    pub const DUPLICATE: &str = "duplicate";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const INTEGRITY: &str = "integrity_error";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
    pub const ENCODING: &str = "encoding_error";
    pub const UNAVAILABLE: &str = "unavailable";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Violations>,
}

/// An error response of the JSON API.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    hint: Option<String>,
    violations: Option<Violations>,
    /// Diagnostic chain for the response log; never sent to the client.
    detail: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            hint: None,
            violations: None,
            detail: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn validation(violations: Violations) -> Self {
        let mut error = Self::new(
            StatusCode::BAD_REQUEST,
            codes::VALIDATION,
            "The request payload is invalid",
        );
        error.violations = Some(violations);
        error
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, codes::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, codes::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, codes::UNAVAILABLE, message)
    }
}

impl From<Violations> for ApiError {
    fn from(violations: Violations) -> Self {
        Self::validation(violations)
    }
}

impl From<ApiAuthError> for ApiError {
    fn from(err: ApiAuthError) -> Self {
        let hint = match err {
            ApiAuthError::Invalid => "Check the token passed in Authorization or X-Api-Key",
            ApiAuthError::Expired => "Issue a new key with `bookapi issue-key`",
            ApiAuthError::Revoked => "This key has been revoked",
        };
        Self::unauthorized(err.to_string()).with_hint(hint)
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        let detail = err.to_string();
        let error = match err {
            RepoError::NotFound => Self::not_found("Resource not found"),
            RepoError::Duplicate { constraint } => {
                Self::new(StatusCode::CONFLICT, codes::DUPLICATE, "Duplicate record")
                    .with_hint(constraint)
            }
            RepoError::InvalidInput { message } => {
                Self::new(StatusCode::BAD_REQUEST, codes::INVALID_INPUT, "Invalid input")
                    .with_hint(message)
            }
            RepoError::Integrity { .. } => Self::new(
                StatusCode::CONFLICT,
                codes::INTEGRITY,
                "Integrity constraint violated",
            ),
            RepoError::Timeout => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::DB_TIMEOUT,
                "Database timeout",
            ),
            RepoError::Persistence(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::REPO,
                "Persistence error",
            ),
        };
        error.with_detail(detail)
    }
}

impl From<ResourceError> for ApiError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::Unauthenticated => {
                Self::unauthorized("API key required").with_hint("Send an admin key as a Bearer token")
            }
            ResourceError::Forbidden { message } => Self::forbidden(message),
            ResourceError::Validation(violations) => Self::validation(violations),
            ResourceError::NotFound { resource } => Self::not_found(format!("{resource} not found")),
            ResourceError::Codec(err) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::ENCODING,
                "Failed to encode response",
            )
            .with_detail(err.to_string()),
            ResourceError::Repo(err) => Self::from(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report_message = match self.detail.as_deref() {
            Some(detail) => format!("{}: {detail}", self.code),
            None => format!(
                "{}: {}",
                self.code,
                self.hint.as_deref().unwrap_or(&self.message)
            ),
        };
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code,
                message: self.message,
                hint: self.hint,
                violations: self.violations,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message("infra::http::api", self.status, report_message)
            .attach(&mut response);
        response
    }
}
