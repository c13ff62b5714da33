use crate::db::*;
use crate::error::{AppError, Result};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Arc;

const BOOK_COLUMNS: &str =
    "id, title, author, category, pdf_path, thumbnail_path, created_at, updated_at";

/// Database wrapper for thread-safe access.
///
/// Every operation locks the connection for a single statement; the guard is
/// released when the call returns, whatever the outcome.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Open in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            -- AUTOINCREMENT keeps ids of deleted rows from being handed out again
            CREATE TABLE IF NOT EXISTS books (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                category TEXT NOT NULL DEFAULT '',
                pdf_path TEXT NOT NULL,
                thumbnail_path TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .map_err(|e| AppError::Database(format!("Failed to initialize schema: {}", e)))?;

        Ok(())
    }

    // ========== BOOK OPERATIONS ==========

    /// Insert a new book and return its identifier.
    pub fn create_book(&self, book: &NewBook) -> Result<i64> {
        require_text("title", &book.title)?;
        require_text("author", &book.author)?;

        let now = now_timestamp();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO books
             (title, author, category, pdf_path, thumbnail_path, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                book.title.trim(),
                book.author.trim(),
                book.category.trim(),
                book.pdf_path,
                book.thumbnail_path,
                now,
                now,
            ],
        )
        .map_err(|e| AppError::Database(format!("Failed to create book: {}", e)))?;

        Ok(conn.last_insert_rowid())
    }

    /// List every book, oldest first.
    pub fn list_books(&self) -> Result<Vec<Book>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!("SELECT {} FROM books ORDER BY id", BOOK_COLUMNS))
            .map_err(|e| AppError::Database(format!("Failed to prepare query: {}", e)))?;

        let books = stmt
            .query_map([], Self::row_to_book)
            .map_err(|e| AppError::Database(format!("Failed to list books: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Database(format!("Failed to collect books: {}", e)))?;

        Ok(books)
    }

    /// Get book by ID.
    pub fn get_book(&self, id: i64) -> Result<Book> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {} FROM books WHERE id = ?1", BOOK_COLUMNS),
            params![id],
            Self::row_to_book,
        )
        .optional()
        .map_err(|e| AppError::Database(format!("Failed to get book: {}", e)))?
        .ok_or_else(|| AppError::NotFound(format!("Book {}", id)))
    }

    /// Apply the supplied fields to a book and return the updated row.
    pub fn update_book(&self, id: i64, changes: &BookChanges) -> Result<Book> {
        if let Some(title) = &changes.title {
            require_text("title", title)?;
        }
        if let Some(author) = &changes.author {
            require_text("author", author)?;
        }
        if changes.is_empty() {
            return self.get_book(id);
        }

        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "UPDATE books SET
                    title = COALESCE(?2, title),
                    author = COALESCE(?3, author),
                    category = COALESCE(?4, category),
                    pdf_path = COALESCE(?5, pdf_path),
                    thumbnail_path = COALESCE(?6, thumbnail_path),
                    updated_at = ?7
                 WHERE id = ?1
                 RETURNING {}",
                BOOK_COLUMNS
            ),
            params![
                id,
                changes.title.as_deref().map(str::trim),
                changes.author.as_deref().map(str::trim),
                changes.category.as_deref().map(str::trim),
                changes.pdf_path,
                changes.thumbnail_path,
                now_timestamp(),
            ],
            Self::row_to_book,
        )
        .optional()
        .map_err(|e| AppError::Database(format!("Failed to update book: {}", e)))?
        .ok_or_else(|| AppError::NotFound(format!("Book {}", id)))
    }

    /// Delete a book and return the removed row.
    pub fn delete_book(&self, id: i64) -> Result<Book> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("DELETE FROM books WHERE id = ?1 RETURNING {}", BOOK_COLUMNS),
            params![id],
            Self::row_to_book,
        )
        .optional()
        .map_err(|e| AppError::Database(format!("Failed to delete book: {}", e)))?
        .ok_or_else(|| AppError::NotFound(format!("Book {}", id)))
    }

    /// Case-insensitive substring search over title and author.
    pub fn search_books(&self, term: &str) -> Result<Vec<Book>> {
        // SQLite's LOWER/LIKE only fold ASCII, so matching happens here.
        let needle = term.to_lowercase();
        let books = self
            .list_books()?
            .into_iter()
            .filter(|b| {
                b.title.to_lowercase().contains(&needle)
                    || b.author.to_lowercase().contains(&needle)
            })
            .collect();

        Ok(books)
    }

    /// Number of stored books.
    pub fn count_books(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))
            .map_err(|e| AppError::Database(format!("Failed to count books: {}", e)))?;
        Ok(count as usize)
    }

    /// Helper to convert a row to Book.
    fn row_to_book(row: &rusqlite::Row<'_>) -> rusqlite::Result<Book> {
        Ok(Book {
            id: row.get(0)?,
            title: row.get(1)?,
            author: row.get(2)?,
            category: row.get(3)?,
            pdf_path: row.get(4)?,
            thumbnail_path: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}
