use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::application::access::Caller;

use super::error::ApiError;
use super::state::ApiState;

/// Resolve the request's [`Caller`]. Requests without a token continue
/// anonymously; a token that does not authenticate is rejected here.
pub async fn resolve_caller(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let caller = match extract_token(request.headers()) {
        None => Caller::Anonymous,
        Some(token) => match state.api_keys.authenticate(&token).await {
            Ok(principal) => Caller::Key(principal),
            Err(err) => return ApiError::from(err).into_response(),
        },
    };

    request.extensions_mut().insert(caller.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(caller);
    response
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.strip_prefix("Bearer "));
    let api_key = || {
        headers
            .get("x-api-key")
            .and_then(|value| value.to_str().ok())
    };

    bearer
        .or_else(api_key)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn bearer_token_wins_over_api_key_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer bk_a_b"));
        headers.insert("x-api-key", HeaderValue::from_static("bk_c_d"));

        assert_eq!(extract_token(&headers).as_deref(), Some("bk_a_b"));
    }

    #[test]
    fn api_key_header_is_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("bk_c_d"));

        assert_eq!(extract_token(&headers).as_deref(), Some("bk_c_d"));
    }

    #[test]
    fn missing_or_blank_token_is_anonymous() {
        assert!(extract_token(&HeaderMap::new()).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert!(extract_token(&headers).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(extract_token(&headers).is_none());
    }
}
