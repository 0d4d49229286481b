//! Catalog service: book CRUD and filtered listing.

use crate::auth::models::TIMESTAMP_FORMAT;
use crate::catalog::book_store::BookStore;
use crate::catalog::models::{Book, BookFilter, BookRequest, BookResponse, PageOf};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Outcome of a catalog mutation; missing ids are results, not errors.
#[derive(Debug, PartialEq, Eq)]
pub enum CatalogOutcome {
    Done,
    NotFound,
    BadPublishedDate,
}

pub struct CatalogService {
    books: Arc<BookStore>,
}

impl CatalogService {
    pub fn new(books: Arc<BookStore>) -> Self {
        Self { books }
    }

    /// Persist a new book. Title/author presence is validated upstream.
    pub fn save(&self, request: &BookRequest) -> Result<CatalogOutcome> {
        let published_date = match parse_published_date(&request.published_date) {
            Ok(date) => date,
            Err(_) => return Ok(CatalogOutcome::BadPublishedDate),
        };

        let book = Book {
            id: Uuid::new_v4(),
            title: request.title.clone().unwrap_or_default(),
            author: request.author.clone().unwrap_or_default(),
            published_date,
            available: request.available.unwrap_or(true),
        };
        self.books.insert(&book)?;

        debug!("{} By {} Saved Successfully", book.title, book.author);
        Ok(CatalogOutcome::Done)
    }

    pub fn list(
        &self,
        page: u32,
        size: u32,
        filter: &BookFilter,
    ) -> Result<PageOf<BookResponse>> {
        debug!("Fetching paginated books in the library");
        let (books, total) = self.books.list(page, size, filter)?;
        let content = books.iter().map(BookResponse::from_book).collect();
        Ok(PageOf::new(content, page, size, total))
    }

    /// Apply the provided fields to an existing book.
    pub fn update(&self, id: &Uuid, request: &BookRequest) -> Result<CatalogOutcome> {
        let Some(mut book) = self.books.find_by_id(id)? else {
            warn!("Book not found for id: {}", id);
            return Ok(CatalogOutcome::NotFound);
        };

        if let Some(title) = request.title.as_deref().filter(|s| !s.trim().is_empty()) {
            book.title = title.to_string();
        }
        if let Some(author) = request.author.as_deref().filter(|s| !s.trim().is_empty()) {
            book.author = author.to_string();
        }
        match parse_published_date(&request.published_date) {
            Ok(Some(date)) => book.published_date = Some(date),
            Ok(None) => {}
            Err(_) => return Ok(CatalogOutcome::BadPublishedDate),
        }
        if let Some(available) = request.available {
            book.available = available;
        }

        self.books.update(&book)?;
        Ok(CatalogOutcome::Done)
    }

    pub fn delete(&self, id: &Uuid) -> Result<CatalogOutcome> {
        if self.books.delete(id)? {
            Ok(CatalogOutcome::Done)
        } else {
            warn!("Book not found for id: {}", id);
            Ok(CatalogOutcome::NotFound)
        }
    }
}

fn parse_published_date(value: &Option<String>) -> Result<Option<NaiveDateTime>> {
    match value.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(s) => {
            let parsed = NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
                .with_context(|| format!("Invalid published date: {s}"))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}
