//! API handlers organized by resource type.
//!
//! Helpers for ids, version negotiation and JSON bodies are shared here.

mod authors;
mod books;
mod health;

pub use authors::*;
pub use books::*;
pub use health::*;

use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::application::authors::Created;
use crate::application::codec::ApiVersion;

use super::error::ApiError;
use super::state::ApiState;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Ids that are not integers address nothing, so they are reported as missing.
fn parse_id(raw: &str, resource: &'static str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::not_found(format!("{resource} not found")))
}

fn requested_version(state: &ApiState, headers: &HeaderMap) -> ApiVersion {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok());
    ApiVersion::negotiate(accept, state.default_version)
}

fn json_response(status: StatusCode, body: Bytes) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
        body,
    )
        .into_response()
}

fn created_response(state: &ApiState, created: Created) -> Response {
    let mut response = json_response(StatusCode::CREATED, created.body);
    if let Ok(location) = HeaderValue::from_str(&state.location(&created.location)) {
        response.headers_mut().insert(header::LOCATION, location);
    }
    response
}
