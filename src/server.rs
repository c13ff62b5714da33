//! HTTP server and routes.

mod forms;
mod handlers;
mod state;

pub use forms::{BookResponse, LegacyBook};
pub use state::AppState;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.storage.max_upload_bytes();

    Router::new()
        .route("/", get(handlers::index))
        .route("/pdfs", get(handlers::list_books))
        .route("/pdfs/{id}", get(handlers::get_book))
        .route("/books", get(handlers::legacy_books))
        .route("/upload", post(handlers::upload_book))
        .route("/update/{id}", put(handlers::update_book))
        .route("/delete/{id}", delete(handlers::delete_book))
        .route("/search", get(handlers::search_books))
        .route("/uploads/{kind}/{name}", get(handlers::download_file))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
