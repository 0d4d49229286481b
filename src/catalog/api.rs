//! Catalog endpoints. Mutations are admin-gated; listing is public.

use crate::auth::middleware::{require_admin, CallerContext};
use crate::catalog::models::{BookFilter, BookRequest};
use crate::catalog::service::{CatalogOutcome, CatalogService};
use crate::response::{Envelope, ResponseCode};
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Save a book - POST /books/save
pub async fn save_book(
    State(service): State<Arc<CatalogService>>,
    Extension(ctx): Extension<CallerContext>,
    Json(payload): Json<BookRequest>,
) -> Response {
    let caller = match require_admin(&ctx) {
        Ok(caller) => caller,
        Err(rejection) => return rejection,
    };
    info!(
        "Saving a new book - Title: {:?} (by {})",
        payload.title, caller.username
    );

    if let Some(errors) = validate_book(&payload) {
        return Envelope::validation(errors).into_response();
    }

    map_outcome(service.save(&payload))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub available: Option<bool>,
}

/// List books - GET /books/getBooks (public)
pub async fn get_books(
    State(service): State<Arc<CatalogService>>,
    Query(params): Query<ListParams>,
) -> Response {
    let filter = BookFilter {
        title: params.title,
        author: params.author,
        available: params.available,
    };

    match service.list(
        params.page.unwrap_or(0),
        params.size.unwrap_or(10),
        &filter,
    ) {
        Ok(page) => Json(page).into_response(),
        Err(e) => {
            error!("Error occurred during fetching of books: {:#}", e);
            Envelope::of(ResponseCode::SystemError).into_response()
        }
    }
}

/// Update a book - PUT /books/update/{id}
pub async fn update_book(
    State(service): State<Arc<CatalogService>>,
    Extension(ctx): Extension<CallerContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BookRequest>,
) -> Response {
    if let Err(rejection) = require_admin(&ctx) {
        return rejection;
    }
    info!("Updating a book - id: {}", id);

    map_outcome(service.update(&id, &payload))
}

/// Delete a book - DELETE /books/delete/{id}
pub async fn delete_book(
    State(service): State<Arc<CatalogService>>,
    Extension(ctx): Extension<CallerContext>,
    Path(id): Path<Uuid>,
) -> Response {
    if let Err(rejection) = require_admin(&ctx) {
        return rejection;
    }
    info!("Deleting a book - id: {}", id);

    map_outcome(service.delete(&id))
}

fn map_outcome(outcome: anyhow::Result<CatalogOutcome>) -> Response {
    match outcome {
        Ok(CatalogOutcome::Done) => Envelope::of(ResponseCode::Success).into_response(),
        Ok(CatalogOutcome::NotFound) => Envelope::of(ResponseCode::Failed).into_response(),
        Ok(CatalogOutcome::BadPublishedDate) => Envelope::validation(json!({
            "publishedDate": "Published date must use the yyyy-MM-dd HH:mm:ss format"
        }))
        .into_response(),
        Err(e) => {
            error!("Catalog operation failed: {:#}", e);
            Envelope::of(ResponseCode::SystemError).into_response()
        }
    }
}

fn validate_book(payload: &BookRequest) -> Option<Value> {
    let mut errors = Map::new();
    if payload
        .title
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .is_empty()
    {
        errors.insert(
            "title".to_string(),
            Value::String("Title is required, Please enter one".to_string()),
        );
    }
    if payload
        .author
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .is_empty()
    {
        errors.insert(
            "author".to_string(),
            Value::String("Author is required, Please enter one.".to_string()),
        );
    }

    if errors.is_empty() {
        None
    } else {
        Some(Value::Object(errors))
    }
}
