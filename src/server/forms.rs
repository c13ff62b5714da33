//! Request forms and response bodies.

use crate::catalog::{BookUpdate, FileUpload, NewUpload};
use crate::db::Book;
use crate::error::{AppError, Result};
use crate::server::AppState;
use axum::extract::multipart::Field;
use axum::extract::{FromRequestParts, Multipart, Path};
use serde::{Deserialize, Serialize};

/// Fields read from an upload or update form.
#[derive(Debug, Default)]
struct FormFields {
    title: Option<String>,
    author: Option<String>,
    category: Option<String>,
    pdf: Option<FileUpload>,
    thumbnail: Option<FileUpload>,
}

impl FormFields {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut fields = FormFields::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match name.as_str() {
                "title" => fields.title = Some(read_text(field).await?),
                "author" => fields.author = Some(read_text(field).await?),
                "category" => fields.category = Some(read_text(field).await?),
                "pdf_file" => fields.pdf = read_file(field).await?,
                "thumbnail" => fields.thumbnail = read_file(field).await?,
                other => tracing::debug!(field = %other, "Ignoring unknown form field"),
            }
        }

        Ok(fields)
    }
}

async fn read_text(field: Field<'_>) -> Result<String> {
    Ok(field.text().await?)
}

/// Browsers send an empty part with no file name when no file was chosen.
async fn read_file(field: Field<'_>) -> Result<Option<FileUpload>> {
    let filename = field.file_name().unwrap_or_default().to_string();
    let data = field.bytes().await?;

    if filename.is_empty() && data.is_empty() {
        return Ok(None);
    }

    Ok(Some(FileUpload { filename, data }))
}

/// Path parameters whose parse failures are reported as JSON errors.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Multipart body of `POST /upload`; every field is required.
pub struct UploadForm;

impl UploadForm {
    /// Read the form and check that all fields are present.
    pub async fn parse(multipart: Multipart) -> Result<NewUpload> {
        let fields = FormFields::read(multipart).await?;

        let mut missing = Vec::new();
        if fields.title.is_none() {
            missing.push("title");
        }
        if fields.author.is_none() {
            missing.push("author");
        }
        if fields.category.is_none() {
            missing.push("category");
        }
        if fields.pdf.is_none() {
            missing.push("pdf_file");
        }
        if fields.thumbnail.is_none() {
            missing.push("thumbnail");
        }

        match fields {
            FormFields {
                title: Some(title),
                author: Some(author),
                category: Some(category),
                pdf: Some(pdf),
                thumbnail: Some(thumbnail),
            } => {
                let upload = NewUpload {
                    title,
                    author,
                    category,
                    pdf,
                    thumbnail,
                };
                upload.validate()?;
                Ok(upload)
            }
            _ => Err(AppError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            ))),
        }
    }
}

/// Body of `PUT /update/{id}`; every field is optional.
pub struct UpdateForm;

impl UpdateForm {
    /// Read a multipart update, which may carry replacement files.
    pub async fn parse_multipart(multipart: Multipart) -> Result<BookUpdate> {
        let fields = FormFields::read(multipart).await?;
        let update = BookUpdate {
            title: fields.title,
            author: fields.author,
            category: fields.category,
            pdf: fields.pdf,
            thumbnail: fields.thumbnail,
        };
        update.validate()?;
        Ok(update)
    }

    /// Convert a JSON update, which carries metadata only.
    pub fn from_json(body: UpdateJson) -> Result<BookUpdate> {
        let update = BookUpdate {
            title: body.title,
            author: body.author,
            category: body.category,
            ..Default::default()
        };
        update.validate()?;
        Ok(update)
    }
}

/// JSON update request.
#[derive(Debug, Deserialize)]
pub struct UpdateJson {
    title: Option<String>,
    author: Option<String>,
    category: Option<String>,
}

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Text matched against title and author.
    pub query: Option<String>,
}

/// Book as returned by the JSON API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookResponse {
    /// Book identifier.
    pub id: i64,
    /// Book title.
    pub title: String,
    /// Author name.
    pub author: String,
    /// Category.
    pub category: String,
    /// PDF path relative to the uploads directory.
    pub pdf_path: String,
    /// Thumbnail path relative to the uploads directory.
    pub thumbnail_path: String,
    /// URL serving the PDF.
    pub pdf_url: String,
    /// URL serving the thumbnail.
    pub thumbnail_url: String,
    /// Creation timestamp.
    pub created_at: i64,
    /// Last update timestamp.
    pub updated_at: i64,
}

impl BookResponse {
    /// Build the response for a stored book.
    pub fn new(state: &AppState, book: Book) -> Self {
        Self {
            pdf_url: state.file_url(&book.pdf_path),
            thumbnail_url: state.file_url(&book.thumbnail_path),
            id: book.id,
            title: book.title,
            author: book.author,
            category: book.category,
            pdf_path: book.pdf_path,
            thumbnail_path: book.thumbnail_path,
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

/// Book in the compact listing format served at `/books`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyBook {
    /// Book title.
    pub book_name: String,
    /// Author name.
    pub author_name: String,
    /// URL of the PDF.
    pub file_name: String,
    /// URL of the thumbnail.
    pub cover_photo: String,
}

impl LegacyBook {
    /// Build the legacy entry for a stored book.
    pub fn new(state: &AppState, book: &Book) -> Self {
        Self {
            book_name: book.title.clone(),
            author_name: book.author.clone(),
            file_name: state.file_url(&book.pdf_path),
            cover_photo: state.file_url(&book.thumbnail_path),
        }
    }
}
