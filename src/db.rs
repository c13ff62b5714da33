mod schema;

pub use schema::Database;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Book record as stored in the `books` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Auto-assigned identifier, never reused.
    pub id: i64,
    /// Book title.
    pub title: String,
    /// Author name.
    pub author: String,
    /// Free-form category.
    pub category: String,
    /// File store path of the PDF.
    pub pdf_path: String,
    /// File store path of the thumbnail image.
    pub thumbnail_path: String,
    /// Creation timestamp.
    pub created_at: i64,
    /// Last update timestamp.
    pub updated_at: i64,
}

/// Fields for a new book row.
#[derive(Debug, Clone)]
pub struct NewBook {
    /// Book title.
    pub title: String,
    /// Author name.
    pub author: String,
    /// Free-form category.
    pub category: String,
    /// File store path of the PDF.
    pub pdf_path: String,
    /// File store path of the thumbnail image.
    pub thumbnail_path: String,
}

/// Partial update of a book row. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct BookChanges {
    /// New title.
    pub title: Option<String>,
    /// New author.
    pub author: Option<String>,
    /// New category.
    pub category: Option<String>,
    /// New PDF path.
    pub pdf_path: Option<String>,
    /// New thumbnail path.
    pub thumbnail_path: Option<String>,
}

impl BookChanges {
    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.category.is_none()
            && self.pdf_path.is_none()
            && self.thumbnail_path.is_none()
    }
}

/// Reject blank text for a required field.
pub(crate) fn require_text(field: &str, value: &str) -> crate::error::Result<()> {
    if value.trim().is_empty() {
        return Err(crate::error::AppError::Validation(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}

/// Timestamp helper.
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Convert timestamp to DateTime.
pub fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_else(Utc::now)
}
