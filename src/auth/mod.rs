//! Authentication and authorization: JWT issuance/verification, the
//! request guard, and the credential-backed user service.

pub mod api;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod service;
pub mod user_store;

pub use jwt::JwtHandler;
pub use middleware::auth_guard;
pub use service::AuthService;
pub use user_store::UserStore;
