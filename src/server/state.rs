//! Application state shared across handlers.

use crate::catalog::Catalog;
use crate::config::Config;
use crate::db::Database;
use crate::storage::FileStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,
    /// Database handle.
    pub db: Database,
    /// Catalog over the database and the uploads directory.
    pub catalog: Catalog,
}

impl AppState {
    /// Create application state over an opened database and a file store.
    pub fn new(config: Config, db: Database, files: FileStore) -> Self {
        Self {
            config: Arc::new(config),
            catalog: Catalog::new(db.clone(), files),
            db,
        }
    }

    /// Get the base URL for generating file links.
    pub fn base_url(&self) -> &str {
        self.config.server.public_url.trim_end_matches('/')
    }

    /// Public URL of a stored file.
    pub fn file_url(&self, stored_path: &str) -> String {
        let encoded: Vec<String> = stored_path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/uploads/{}", self.base_url(), encoded.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_public_url(url: &str) -> AppState {
        let mut config = Config::default();
        config.server.public_url = url.to_string();
        AppState::new(
            config,
            Database::open_memory().unwrap(),
            FileStore::new("unused"),
        )
    }

    #[test]
    fn test_file_url_relative() {
        let state = state_with_public_url("");
        assert_eq!(
            state.file_url("pdfs/1-abc-book.pdf"),
            "/uploads/pdfs/1-abc-book.pdf"
        );
    }

    #[test]
    fn test_file_url_with_public_prefix() {
        let state = state_with_public_url("https://books.example.com/");
        assert_eq!(
            state.file_url("thumbnails/1-abc-a b.png"),
            "https://books.example.com/uploads/thumbnails/1-abc-a%20b.png"
        );
    }
}
