//! Author handlers

use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use bytes::Bytes;

use crate::application::access::Caller;
use crate::application::pagination::PageQuery;

use super::{created_response, json_response, parse_id};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;

const RESOURCE: &str = "author";

pub async fn list_authors(
    State(state): State<ApiState>,
    Query(query): Query<PageQuery>,
) -> Result<Response, ApiError> {
    let page = query.resolve(&state.pagination)?;
    let body = state.authors.list(page).await?;
    Ok(json_response(StatusCode::OK, body))
}

pub async fn get_author(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, RESOURCE)?;
    let body = state.authors.get(id).await?;
    Ok(json_response(StatusCode::OK, body))
}

pub async fn create_author(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let created = state.authors.create(&caller, &body).await?;
    Ok(created_response(&state, created))
}

pub async fn update_author(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id, RESOURCE)?;
    state.authors.update(&caller, id, &body).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_author(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id, RESOURCE)?;
    state.authors.delete(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
