use axum::extract::State;
use axum::http::StatusCode;

use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;

pub async fn health(State(state): State<ApiState>) -> Result<StatusCode, ApiError> {
    state
        .health
        .ping()
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(|err| ApiError::unavailable("Store unavailable").with_hint(err.to_string()))
}
