//! On-disk storage for uploaded PDFs and thumbnails.
//!
//! Files live under `<root>/<kind>/<unix_millis>-<random hex>-<sanitized name>`.
//! Stored paths handed to callers are relative to the root and always use `/`.

use crate::error::{AppError, Result};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Kind of stored file, each kept in its own subdirectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Book PDF.
    Pdf,
    /// Cover thumbnail image.
    Thumbnail,
}

impl FileKind {
    /// Subdirectory name under the uploads root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            FileKind::Pdf => "pdfs",
            FileKind::Thumbnail => "thumbnails",
        }
    }

    /// Parse a subdirectory name.
    pub fn from_dir_name(name: &str) -> Option<Self> {
        match name {
            "pdfs" => Some(FileKind::Pdf),
            "thumbnails" => Some(FileKind::Thumbnail),
            _ => None,
        }
    }

    /// Whether `filename` carries an extension accepted for this kind.
    pub fn accepts(&self, filename: &str) -> bool {
        let Some(ext) = extension(filename) else {
            return false;
        };
        match self {
            FileKind::Pdf => ext == "pdf",
            FileKind::Thumbnail => {
                matches!(ext.as_str(), "jpg" | "jpeg" | "png" | "gif" | "webp")
            }
        }
    }
}

/// Lowercased extension of a file name.
fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// MIME type for a stored file, from its extension.
pub fn content_type(stored_path: &str) -> &'static str {
    match extension(stored_path).as_deref() {
        Some("pdf") => "application/pdf",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Reduce a client-supplied file name to a safe final component.
pub fn sanitize_filename(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Uploads directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Use `root` as the uploads directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Uploads directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the uploads directory and its subdirectories.
    pub async fn ensure_dirs(&self) -> Result<()> {
        for kind in [FileKind::Pdf, FileKind::Thumbnail] {
            let dir = self.root.join(kind.dir_name());
            fs::create_dir_all(&dir).await.map_err(|e| {
                AppError::Storage(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }

    /// Write `bytes` under a fresh unique name and return the stored path.
    pub async fn save(
        &self,
        kind: FileKind,
        bytes: &[u8],
        original_name: &str,
    ) -> Result<String> {
        let dir = self.root.join(kind.dir_name());
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create {}: {}", dir.display(), e)))?;

        let name = format!(
            "{}-{}-{}",
            chrono::Utc::now().timestamp_millis(),
            uuid::Uuid::new_v4().simple(),
            sanitize_filename(original_name)
        );
        let path = dir.join(&name);

        // create_new: never clobber an existing upload.
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create {}: {}", path.display(), e)))?;

        let written: std::io::Result<()> = async {
            file.write_all(bytes).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            let _ = fs::remove_file(&path).await;
            return Err(AppError::Storage(format!(
                "Failed to write {}: {}",
                path.display(),
                e
            )));
        }

        let stored = format!("{}/{}", kind.dir_name(), name);
        tracing::debug!(stored = %stored, size = bytes.len(), "Stored file");
        Ok(stored)
    }

    /// Remove a stored file. Already-absent files are not an error.
    pub async fn delete(&self, stored_path: &str) -> Result<()> {
        let path = self.resolve(stored_path)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(stored = %stored_path, "Removed file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Open a stored file for reading.
    pub async fn open(&self, stored_path: &str) -> Result<fs::File> {
        let path = self.resolve(stored_path)?;
        fs::File::open(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                AppError::NotFound(format!("File {}", stored_path))
            } else {
                AppError::Storage(format!("Failed to open {}: {}", path.display(), e))
            }
        })
    }

    /// Absolute location of a stored path, refusing anything outside the root.
    pub fn resolve(&self, stored_path: &str) -> Result<PathBuf> {
        let relative = Path::new(stored_path);
        let safe = !stored_path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));

        if !safe {
            return Err(AppError::Validation(format!(
                "Invalid stored path: {}",
                stored_path
            )));
        }

        Ok(self.root.join(relative))
    }

    /// Best-effort removal used on compensation paths; failures are logged.
    pub async fn discard(&self, stored_path: &str) {
        if let Err(e) = self.delete(stored_path).await {
            tracing::warn!(stored = %stored_path, error = %e, "Failed to remove file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("book.pdf"), "book.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\docs\\My Book.pdf"), "My_Book.pdf");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename(""), "file");
        assert_eq!(sanitize_filename("été.png"), "_t_.png");
    }

    #[test]
    fn test_kind_accepts() {
        assert!(FileKind::Pdf.accepts("book.PDF"));
        assert!(!FileKind::Pdf.accepts("book.epub"));
        assert!(!FileKind::Pdf.accepts("pdf"));
        assert!(FileKind::Thumbnail.accepts("cover.JPEG"));
        assert!(FileKind::Thumbnail.accepts("cover.webp"));
        assert!(!FileKind::Thumbnail.accepts("cover.pdf"));
    }

    #[test]
    fn test_resolve_rejects_escape() {
        let store = FileStore::new("/srv/uploads");
        assert!(store.resolve("pdfs/a.pdf").is_ok());
        assert!(store.resolve("../secret").is_err());
        assert!(store.resolve("/etc/passwd").is_err());
        assert!(store.resolve("").is_err());
    }

    #[tokio::test]
    async fn test_save_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let stored = store
            .save(FileKind::Pdf, b"%PDF-1.4", "a b.pdf")
            .await
            .unwrap();
        assert!(stored.starts_with("pdfs/"));
        assert!(stored.ends_with("-a_b.pdf"));

        let path = store.resolve(&stored).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4");

        store.delete(&stored).await.unwrap();
        assert!(!path.exists());
        // Idempotent
        store.delete(&stored).await.unwrap();
    }

    #[tokio::test]
    async fn test_same_name_gets_distinct_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let (a, b) = tokio::join!(
            store.save(FileKind::Thumbnail, b"one", "cover.png"),
            store.save(FileKind::Thumbnail, b"two", "cover.png"),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a, b);
        assert_eq!(std::fs::read(store.resolve(&a).unwrap()).unwrap(), b"one");
        assert_eq!(std::fs::read(store.resolve(&b).unwrap()).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_open_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let err = store.open("pdfs/missing.pdf").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
