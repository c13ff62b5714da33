//! pdf-shelf: a small service for uploading and managing PDF books.
//!
//! Each book is a row in a SQLite `books` table (title, author, category)
//! pointing at two files kept in an uploads directory: the PDF itself and a
//! thumbnail image.
//!
//! # Features
//!
//! - Multipart upload of a PDF and its thumbnail
//! - JSON listing, search by title or author, partial updates and deletion
//! - Download of stored files under `/uploads`
//! - Static landing page with an upload form
//! - CLI for listing, searching and deleting books

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Upload, update and delete operations spanning database and files.
pub mod catalog;
/// Configuration and CLI.
pub mod config;
/// Database operations.
pub mod db;
/// Error types.
pub mod error;
/// HTTP server.
pub mod server;
/// Uploaded file storage.
pub mod storage;


pub use catalog::Catalog;
pub use config::{Cli, Command, Config};
pub use db::Database;
pub use error::{AppError, Result};
pub use server::AppState;
pub use storage::FileStore;
