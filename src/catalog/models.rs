//! Book records and their request/response shapes.

use crate::auth::models::TIMESTAMP_FORMAT;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Book as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub published_date: Option<NaiveDateTime>,
    pub available: bool,
}

/// Create/update request body. Title and author are required on create;
/// the other fields are optional and left untouched when absent on
/// update.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub available: Option<bool>,
}

/// Book projection returned by the list endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub published_date: Option<String>,
    pub available: bool,
}

impl BookResponse {
    pub fn from_book(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            published_date: book
                .published_date
                .map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
            available: book.available,
        }
    }
}

/// Optional list filters; blank strings mean "no filter".
#[derive(Debug, Default, Clone)]
pub struct BookFilter {
    pub title: Option<String>,
    pub author: Option<String>,
    pub available: Option<bool>,
}

/// One page of results plus paging metadata.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageOf<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> PageOf<T> {
    pub fn new(content: Vec<T>, page: u32, size: u32, total_elements: u64) -> Self {
        let total_pages = if size == 0 {
            0
        } else {
            total_elements.div_ceil(size as u64)
        };
        Self {
            content,
            page,
            size,
            total_elements,
            total_pages,
        }
    }
}
