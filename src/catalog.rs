//! Book catalog: the operations that touch both the database and the file store.
//!
//! Files are always written before the row is committed. When the row write
//! fails, the files written for that request are removed again; a crash between
//! the two steps can still leave an orphaned file behind. Two concurrent updates
//! replacing the same file both remove the old one and orphan one new file.

use crate::db::{Book, BookChanges, Database, NewBook, require_text};
use crate::error::{AppError, Result};
use crate::storage::{FileKind, FileStore};
use axum::body::Bytes;

/// Uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct FileUpload {
    /// Client-supplied file name.
    pub filename: String,
    /// File contents.
    pub data: Bytes,
}

impl FileUpload {
    fn check(&self, kind: FileKind, field: &str) -> Result<()> {
        if !kind.accepts(&self.filename) {
            return Err(AppError::Validation(format!(
                "{} has an unsupported file type: {}",
                field, self.filename
            )));
        }
        Ok(())
    }
}

/// A complete new book: metadata plus both files.
#[derive(Debug, Clone)]
pub struct NewUpload {
    /// Book title.
    pub title: String,
    /// Author name.
    pub author: String,
    /// Category.
    pub category: String,
    /// PDF file.
    pub pdf: FileUpload,
    /// Thumbnail image.
    pub thumbnail: FileUpload,
}

impl NewUpload {
    /// Check field contents before anything is stored.
    pub fn validate(&self) -> Result<()> {
        require_text("title", &self.title)?;
        require_text("author", &self.author)?;
        self.pdf.check(FileKind::Pdf, "pdf_file")?;
        self.thumbnail.check(FileKind::Thumbnail, "thumbnail")
    }
}

/// Partial update of a book. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct BookUpdate {
    /// New title.
    pub title: Option<String>,
    /// New author.
    pub author: Option<String>,
    /// New category.
    pub category: Option<String>,
    /// Replacement PDF.
    pub pdf: Option<FileUpload>,
    /// Replacement thumbnail.
    pub thumbnail: Option<FileUpload>,
}

impl BookUpdate {
    /// Check supplied fields before anything is stored.
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            require_text("title", title)?;
        }
        if let Some(author) = &self.author {
            require_text("author", author)?;
        }
        if let Some(pdf) = &self.pdf {
            pdf.check(FileKind::Pdf, "pdf_file")?;
        }
        if let Some(thumbnail) = &self.thumbnail {
            thumbnail.check(FileKind::Thumbnail, "thumbnail")?;
        }
        Ok(())
    }

    /// Whether the update carries no field at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.category.is_none()
            && self.pdf.is_none()
            && self.thumbnail.is_none()
    }
}

/// Book catalog over a database and a file store.
#[derive(Clone)]
pub struct Catalog {
    db: Database,
    files: FileStore,
}

impl Catalog {
    /// Create a catalog.
    pub fn new(db: Database, files: FileStore) -> Self {
        Self { db, files }
    }

    /// Underlying database.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Underlying file store.
    pub fn files(&self) -> &FileStore {
        &self.files
    }

    /// Store both files and insert the book row.
    pub async fn upload(&self, upload: NewUpload) -> Result<Book> {
        upload.validate()?;

        let pdf_path = self
            .files
            .save(FileKind::Pdf, &upload.pdf.data, &upload.pdf.filename)
            .await?;

        let thumbnail_path = match self
            .files
            .save(
                FileKind::Thumbnail,
                &upload.thumbnail.data,
                &upload.thumbnail.filename,
            )
            .await
        {
            Ok(path) => path,
            Err(e) => {
                self.files.discard(&pdf_path).await;
                return Err(e);
            }
        };

        let new_book = NewBook {
            title: upload.title,
            author: upload.author,
            category: upload.category,
            pdf_path: pdf_path.clone(),
            thumbnail_path: thumbnail_path.clone(),
        };

        let id = match self.db.create_book(&new_book) {
            Ok(id) => id,
            Err(e) => {
                self.files.discard(&pdf_path).await;
                self.files.discard(&thumbnail_path).await;
                return Err(e);
            }
        };

        tracing::info!(id, title = %new_book.title, "Book uploaded");
        self.db.get_book(id)
    }

    /// Apply a partial update. Replaced files are removed once the row is updated.
    pub async fn update(&self, id: i64, update: BookUpdate) -> Result<Book> {
        update.validate()?;

        let current = self.db.get_book(id)?;
        if update.is_empty() {
            return Ok(current);
        }

        let mut changes = BookChanges {
            title: update.title,
            author: update.author,
            category: update.category,
            ..Default::default()
        };

        if let Some(pdf) = &update.pdf {
            let path = self
                .files
                .save(FileKind::Pdf, &pdf.data, &pdf.filename)
                .await?;
            changes.pdf_path = Some(path);
        }

        if let Some(thumbnail) = &update.thumbnail {
            match self
                .files
                .save(FileKind::Thumbnail, &thumbnail.data, &thumbnail.filename)
                .await
            {
                Ok(path) => changes.thumbnail_path = Some(path),
                Err(e) => {
                    self.discard_new_files(&changes).await;
                    return Err(e);
                }
            }
        }

        let updated = match self.db.update_book(id, &changes) {
            Ok(book) => book,
            Err(e) => {
                self.discard_new_files(&changes).await;
                return Err(e);
            }
        };

        if changes.pdf_path.is_some() && current.pdf_path != updated.pdf_path {
            self.files.discard(&current.pdf_path).await;
        }
        if changes.thumbnail_path.is_some() && current.thumbnail_path != updated.thumbnail_path {
            self.files.discard(&current.thumbnail_path).await;
        }

        tracing::info!(id, "Book updated");
        Ok(updated)
    }

    /// Delete the book row and both of its files.
    pub async fn remove(&self, id: i64) -> Result<Book> {
        let removed = self.db.delete_book(id)?;

        self.files.discard(&removed.pdf_path).await;
        self.files.discard(&removed.thumbnail_path).await;

        tracing::info!(id, title = %removed.title, "Book deleted");
        Ok(removed)
    }

    async fn discard_new_files(&self, changes: &BookChanges) {
        if let Some(path) = &changes.pdf_path {
            self.files.discard(path).await;
        }
        if let Some(path) = &changes.thumbnail_path {
            self.files.discard(path).await;
        }
    }
}
