//! Book catalog: storage, service, and HTTP endpoints.

pub mod api;
pub mod book_store;
pub mod models;
pub mod service;

pub use book_store::BookStore;
pub use service::CatalogService;
