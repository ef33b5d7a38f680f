pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

pub use state::ApiState;

use axum::{Router, middleware as axum_middleware, routing::get};

use crate::infra::http::middleware::{log_responses, set_request_context};

pub fn build_api_router(state: ApiState) -> Router {
    let auth_state = state.clone();

    Router::new()
        .route(
            "/api/authors",
            get(handlers::list_authors).post(handlers::create_author),
        )
        .route(
            "/api/author/{id}",
            get(handlers::get_author)
                .put(handlers::update_author)
                .delete(handlers::delete_author),
        )
        .route(
            "/api/books",
            get(handlers::list_books).post(handlers::create_book),
        )
        .route(
            "/api/book/{id}",
            get(handlers::get_book)
                .put(handlers::update_book)
                .delete(handlers::delete_book),
        )
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(
            auth_state,
            middleware::resolve_caller,
        ))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
