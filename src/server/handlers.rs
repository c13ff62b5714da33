//! HTTP request handlers.

use crate::error::{AppError, Result};
use crate::server::AppState;
use crate::server::forms::{
    ApiPath, BookResponse, LegacyBook, SearchParams, UpdateForm, UpdateJson, UploadForm,
};
use crate::storage::{self, FileKind};
use axum::{
    Json,
    body::Body,
    extract::{FromRequest, Multipart, Query, Request, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, Response},
};
use tokio_util::io::ReaderStream;

// ============================================================================
// WEB PAGES
// ============================================================================

/// Landing page (static HTML with an upload form).
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <style>
        body {{ font-family: system-ui, sans-serif; max-width: 600px; margin: 2rem auto; padding: 0 1rem; }}
        h1 {{ color: #333; }}
        a {{ color: #0066cc; }}
        form {{ background: #f5f5f5; padding: 1rem; border-radius: 8px; margin: 1rem 0; }}
        label {{ display: block; margin: 0.5rem 0; }}
        code {{ background: #e8e8e8; padding: 0.2rem 0.4rem; border-radius: 4px; }}
    </style>
</head>
<body>
    <h1>{title}</h1>
    <h2>Upload a book</h2>
    <form action="/upload" method="post" enctype="multipart/form-data">
        <label>Title <input name="title" required></label>
        <label>Author <input name="author" required></label>
        <label>Category <input name="category" required></label>
        <label>PDF <input type="file" name="pdf_file" accept=".pdf,application/pdf" required></label>
        <label>Thumbnail <input type="file" name="thumbnail" accept="image/*" required></label>
        <button type="submit">Upload</button>
    </form>
    <h2>API</h2>
    <ul>
        <li><a href="/pdfs">All books (JSON)</a></li>
        <li><code>GET /search?query=term</code></li>
        <li><code>PUT /update/&lt;id&gt;</code></li>
        <li><code>DELETE /delete/&lt;id&gt;</code></li>
    </ul>
</body>
</html>"#,
        title = escape_html(&state.config.server.title),
    );

    Html(html)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ============================================================================
// BOOK API
// ============================================================================

/// All books (JSON).
pub async fn list_books(State(state): State<AppState>) -> Result<Json<Vec<BookResponse>>> {
    let books = state.db.list_books()?;
    Ok(Json(
        books
            .into_iter()
            .map(|b| BookResponse::new(&state, b))
            .collect(),
    ))
}

/// Single book (JSON).
pub async fn get_book(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<BookResponse>> {
    let book = state.db.get_book(id)?;
    Ok(Json(BookResponse::new(&state, book)))
}

/// All books in the compact `/books` listing format.
pub async fn legacy_books(State(state): State<AppState>) -> Result<Json<Vec<LegacyBook>>> {
    let books = state.db.list_books()?;
    Ok(Json(
        books.iter().map(|b| LegacyBook::new(&state, b)).collect(),
    ))
}

/// Upload a new book with its PDF and thumbnail.
pub async fn upload_book(
    State(state): State<AppState>,
    request: Request,
) -> Result<(StatusCode, Json<BookResponse>)> {
    let multipart = Multipart::from_request(request, &state).await?;
    let upload = UploadForm::parse(multipart).await?;
    let book = state.catalog.upload(upload).await?;
    Ok((StatusCode::CREATED, Json(BookResponse::new(&state, book))))
}

/// Update any subset of a book's fields, from multipart or JSON.
pub async fn update_book(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    request: Request,
) -> Result<Json<BookResponse>> {
    let update = if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &state).await?;
        UpdateForm::parse_multipart(multipart).await?
    } else {
        let Json(body) = Json::<UpdateJson>::from_request(request, &state).await?;
        UpdateForm::from_json(body)?
    };

    let book = state.catalog.update(id, update).await?;
    Ok(Json(BookResponse::new(&state, book)))
}

/// Delete a book and its files.
pub async fn delete_book(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode> {
    state.catalog.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Search books by title or author.
pub async fn search_books(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<BookResponse>>> {
    let query = params
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Missing query parameter: query".to_string()))?;

    let books = state.db.search_books(&query)?;
    Ok(Json(
        books
            .into_iter()
            .map(|b| BookResponse::new(&state, b))
            .collect(),
    ))
}

// ============================================================================
// FILES
// ============================================================================

/// Stored file download.
pub async fn download_file(
    State(state): State<AppState>,
    ApiPath((kind, name)): ApiPath<(String, String)>,
) -> Result<Response<Body>> {
    let kind = FileKind::from_dir_name(&kind)
        .ok_or_else(|| AppError::NotFound(format!("Unknown file kind: {}", kind)))?;
    let stored = format!("{}/{}", kind.dir_name(), name);

    let file = state.catalog.files().open(&stored).await?;
    let size = file.metadata().await?.len();
    let body = Body::from_stream(ReaderStream::new(file));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, storage::content_type(&stored))
        .header(header::CONTENT_LENGTH, size)
        .header(header::CACHE_CONTROL, "public, max-age=86400")
        .body(body)
        .map_err(|e| AppError::Internal(e.to_string()))
}

// ============================================================================
// HELPERS
// ============================================================================

/// Whether the request carries a multipart body.
fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().starts_with("multipart/form-data"))
}
