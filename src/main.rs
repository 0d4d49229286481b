//! BookStack - book catalog REST service
//!
//! JWT-authenticated user accounts with role-based access, and a
//! paginated, filterable book catalog backed by SQLite.

mod auth;
mod catalog;
mod config;
mod mail;
mod middleware;
mod response;

use anyhow::{Context, Result};
use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    auth::{api as auth_api, auth_guard, AuthService, JwtHandler, UserStore},
    catalog::{api as catalog_api, BookStore, CatalogService},
    config::Config,
    mail::Mailer,
    middleware::request_logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    info!("Starting BookStack backend on port {}", config.port);

    let app = build_app(&config)?;

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookstack_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wire stores, services, and routes into the application router.
fn build_app(config: &Config) -> Result<Router> {
    let users = Arc::new(UserStore::new(&config.database_path)?);
    let books = Arc::new(BookStore::new(&config.database_path)?);
    let jwt = Arc::new(JwtHandler::new(
        config.jwt_secret.clone(),
        config.token_ttl_hours,
    ));

    let http_client = reqwest::Client::new();
    let mailer = Mailer::new(
        http_client,
        config.mail_relay_url.clone(),
        config.mail_sender.clone(),
    );

    let auth_service = Arc::new(AuthService::new(
        users,
        jwt.clone(),
        mailer,
        config.public_base_url.clone(),
    ));
    let catalog_service = Arc::new(CatalogService::new(books));

    // Authentication endpoints bypass the guard entirely.
    let auth_routes = Router::new()
        .route("/users/auth/login", post(auth_api::login))
        .route("/users/auth/register", post(auth_api::register))
        .route("/users/auth/register/admin", post(auth_api::register_admin))
        .route(
            "/users/auth/register/admin/activate",
            get(auth_api::activate_admin),
        )
        .with_state(auth_service.clone());

    let user_routes = Router::new()
        .route("/users/update", put(auth_api::update_profile))
        .with_state(auth_service)
        .layer(axum_middleware::from_fn_with_state(jwt.clone(), auth_guard));

    // getBooks is public but rides behind the guard too; the guard never
    // rejects, it only resolves the caller when a token is present.
    let book_routes = Router::new()
        .route("/books/save", post(catalog_api::save_book))
        .route("/books/getBooks", get(catalog_api::get_books))
        .route("/books/update/:id", put(catalog_api::update_book))
        .route("/books/delete/:id", delete(catalog_api::delete_book))
        .with_state(catalog_service)
        .layer(axum_middleware::from_fn_with_state(jwt, auth_guard));

    Ok(Router::new()
        .route("/health", get(health_check))
        .merge(auth_routes)
        .merge(user_routes)
        .merge(book_routes)
        .layer(axum_middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive()))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use tempfile::NamedTempFile;
    use tower::ServiceExt;

    fn test_app() -> (Router, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let config = Config {
            database_path: temp_file.path().to_str().unwrap().to_string(),
            port: 0,
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: 24,
            public_base_url: "http://localhost:8080".to_string(),
            mail_relay_url: None,
            mail_sender: "no-reply@test".to_string(),
        };
        (build_app(&config).unwrap(), temp_file)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register_and_login(app: &Router, as_admin: bool) -> String {
        let path = if as_admin {
            "/users/auth/register/admin"
        } else {
            "/users/auth/register"
        };
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                path,
                json!({
                    "firstName": "Jane",
                    "lastName": "Doe",
                    "email": "j@x.com",
                    "username": "jdoe",
                    "password": "P@ss1"
                }),
            ))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["responseCode"], "000");

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/users/auth/login",
                json!({ "username": "jdoe", "password": "P@ss1" }),
            ))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["responseCode"], "000");
        body["info"]["bearerToken"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (app, _temp) = test_app();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_register_login_scenario() {
        let (app, _temp) = test_app();
        let token = register_and_login(&app, false).await;
        assert!(!token.is_empty());

        // Same email, different username -> duplicate-email code
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/users/auth/register",
                json!({
                    "firstName": "John",
                    "lastName": "Doe",
                    "email": "j@x.com",
                    "username": "johnd",
                    "password": "P@ss1"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["responseCode"], "E12");

        // Wrong password -> bad-credentials code
        let response = app
            .oneshot(json_request(
                "POST",
                "/users/auth/login",
                json!({ "username": "jdoe", "password": "nope" }),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["responseCode"], "EC001");
    }

    #[tokio::test]
    async fn test_login_unknown_user_code() {
        let (app, _temp) = test_app();
        let response = app
            .oneshot(json_request(
                "POST",
                "/users/auth/login",
                json!({ "username": "ghost", "password": "x" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["responseCode"], "EC002");
    }

    #[tokio::test]
    async fn test_book_mutation_requires_admin_role() {
        let (app, _temp) = test_app();
        let book = json!({ "title": "Effective Java", "author": "Joshua Bloch" });

        // No token
        let response = app
            .clone()
            .oneshot(json_request("POST", "/books/save", book.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["responseCode"], "E40");

        // Standard-user token
        let token = register_and_login(&app, false).await;
        let mut request = json_request("POST", "/books/save", book);
        request.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // Store untouched
        let response = app
            .oneshot(Request::get("/books/getBooks").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await["totalElements"], 0);
    }

    #[tokio::test]
    async fn test_admin_flow_saves_and_filters_books() {
        let (app, _temp) = test_app();
        let token = register_and_login(&app, true).await;

        // Promote via the activation link, then login again for an
        // admin-role token.
        let jwt = JwtHandler::new("test-secret".to_string(), 24);
        let user_id = jwt.verify(&token).unwrap().sub;
        let response = app
            .clone()
            .oneshot(
                Request::get(format!("/users/auth/register/admin/activate?id={user_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(response).await["responseCode"], "000");

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/users/auth/login",
                json!({ "username": "jdoe", "password": "P@ss1" }),
            ))
            .await
            .unwrap();
        let admin_token = body_json(response).await["info"]["bearerToken"]
            .as_str()
            .unwrap()
            .to_string();

        for (title, author) in [
            ("Effective Java", "Joshua Bloch"),
            ("The Rust Programming Language", "Steve Klabnik"),
        ] {
            let mut request = json_request(
                "POST",
                "/books/save",
                json!({ "title": title, "author": author }),
            );
            request.headers_mut().insert(
                header::AUTHORIZATION,
                format!("Bearer {admin_token}").parse().unwrap(),
            );
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(body_json(response).await["responseCode"], "000");
        }

        // Case-insensitive title filter
        let response = app
            .oneshot(
                Request::get("/books/getBooks?title=java")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["totalElements"], 1);
        assert_eq!(body["content"][0]["title"], "Effective Java");
    }

    #[tokio::test]
    async fn test_profile_update_requires_token() {
        let (app, _temp) = test_app();
        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                "/users/update",
                json!({ "firstName": "Janet" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let token = register_and_login(&app, false).await;
        let mut request = json_request("PUT", "/users/update", json!({ "firstName": "Janet" }));
        request.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(body_json(response).await["responseCode"], "000");
    }

    #[tokio::test]
    async fn test_garbage_token_leaves_request_unauthenticated() {
        let (app, _temp) = test_app();
        let mut request = json_request(
            "POST",
            "/books/save",
            json!({ "title": "T", "author": "A" }),
        );
        request
            .headers_mut()
            .insert(header::AUTHORIZATION, "Bearer not.a.token".parse().unwrap());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_validation_errors_ride_in_200() {
        let (app, _temp) = test_app();

        let response = app
            .oneshot(json_request(
                "POST",
                "/users/auth/register",
                json!({ "username": "x" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["responseCode"], "002");
        assert!(body["errorMessage"]["email"].is_string());
    }
}
