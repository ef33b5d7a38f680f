//! Book handlers

use axum::extract::{Extension, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use bytes::Bytes;

use crate::application::access::Caller;
use crate::application::pagination::PageQuery;

use super::{created_response, json_response, parse_id, requested_version};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;

const RESOURCE: &str = "book";

pub async fn list_books(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<Response, ApiError> {
    let page = query.resolve(&state.pagination)?;
    let version = requested_version(&state, &headers);
    let body = state.books.list(page, version).await?;
    Ok(json_response(StatusCode::OK, body))
}

pub async fn get_book(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, RESOURCE)?;
    let version = requested_version(&state, &headers);
    let body = state.books.get(id, version).await?;
    Ok(json_response(StatusCode::OK, body))
}

pub async fn create_book(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let version = requested_version(&state, &headers);
    let created = state.books.create(&caller, &body, version).await?;
    Ok(created_response(&state, created))
}

pub async fn update_book(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id, RESOURCE)?;
    state.books.update(&caller, id, &body).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_book(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id, RESOURCE)?;
    state.books.delete(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
