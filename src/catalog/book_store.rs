//! Book storage backed by SQLite.

use crate::auth::models::TIMESTAMP_FORMAT;
use crate::catalog::models::{Book, BookFilter};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{params, params_from_iter, types::Value as SqlValue, Connection, Row};
use uuid::Uuid;

pub struct BookStore {
    db_path: String,
}

impl BookStore {
    pub fn new(db_path: &str) -> Result<Self> {
        let store = Self {
            db_path: db_path.to_string(),
        };
        store.init_db()?;
        Ok(store)
    }

    fn init_db(&self) -> Result<()> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS books (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                published_date TEXT,
                available INTEGER NOT NULL DEFAULT 1
            )",
            [],
        )?;
        Ok(())
    }

    fn row_to_book(row: &Row) -> rusqlite::Result<Book> {
        let published_date: Option<String> = row.get(3)?;
        Ok(Book {
            id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
            title: row.get(1)?,
            author: row.get(2)?,
            published_date: published_date
                .and_then(|s| NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT).ok()),
            available: row.get(4)?,
        })
    }

    pub fn insert(&self, book: &Book) -> Result<()> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "INSERT INTO books (id, title, author, published_date, available)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                book.id.to_string(),
                book.title,
                book.author,
                book.published_date
                    .map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
                book.available,
            ],
        )
        .context("Failed to insert book")?;
        Ok(())
    }

    pub fn update(&self, book: &Book) -> Result<()> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "UPDATE books SET title = ?2, author = ?3, published_date = ?4, available = ?5
             WHERE id = ?1",
            params![
                book.id.to_string(),
                book.title,
                book.author,
                book.published_date
                    .map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
                book.available,
            ],
        )
        .context("Failed to update book")?;
        Ok(())
    }

    pub fn find_by_id(&self, id: &Uuid) -> Result<Option<Book>> {
        let conn = Connection::open(&self.db_path)?;
        let mut stmt = conn.prepare(
            "SELECT id, title, author, published_date, available FROM books WHERE id = ?1",
        )?;
        match stmt.query_row(params![id.to_string()], Self::row_to_book) {
            Ok(book) => Ok(Some(book)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a book. Returns false when the id does not exist.
    pub fn delete(&self, id: &Uuid) -> Result<bool> {
        let conn = Connection::open(&self.db_path)?;
        let rows = conn.execute("DELETE FROM books WHERE id = ?1", params![id.to_string()])?;
        Ok(rows > 0)
    }

    pub fn count(&self) -> Result<u64> {
        let conn = Connection::open(&self.db_path)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Filtered, paginated listing ordered by published date descending.
    /// Title/author filters are case-insensitive substring matches.
    pub fn list(&self, page: u32, size: u32, filter: &BookFilter) -> Result<(Vec<Book>, u64)> {
        let mut where_clauses: Vec<&str> = Vec::new();
        let mut args: Vec<SqlValue> = Vec::new();

        if let Some(title) = filter.title.as_deref().filter(|s| !s.trim().is_empty()) {
            where_clauses.push("lower(title) LIKE ?");
            args.push(SqlValue::Text(format!("%{}%", title.to_lowercase())));
        }
        if let Some(author) = filter.author.as_deref().filter(|s| !s.trim().is_empty()) {
            where_clauses.push("lower(author) LIKE ?");
            args.push(SqlValue::Text(format!("%{}%", author.to_lowercase())));
        }
        if let Some(available) = filter.available {
            where_clauses.push("available = ?");
            args.push(SqlValue::Integer(available as i64));
        }

        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", where_clauses.join(" AND "))
        };

        let conn = Connection::open(&self.db_path)?;

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM books{where_sql}"),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;

        // SQLite sorts NULLs low, so undated books land at the end of a
        // descending sort.
        let mut stmt = conn.prepare(&format!(
            "SELECT id, title, author, published_date, available FROM books{where_sql}
             ORDER BY published_date DESC LIMIT ? OFFSET ?"
        ))?;

        args.push(SqlValue::Integer(size as i64));
        args.push(SqlValue::Integer(page as i64 * size as i64));

        let books = stmt
            .query_map(params_from_iter(args.iter()), Self::row_to_book)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((books, total as u64))
    }
}
