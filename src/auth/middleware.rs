//! Authorization guard.
//!
//! Resolves the bearer token on every request passing through it and
//! attaches the resolved identity to the request context. A missing or
//! invalid token never aborts the pipeline here; handlers that need an
//! identity (or a role) reject for themselves.

use crate::auth::jwt::JwtHandler;
use crate::auth::models::{AuthenticatedCaller, Role};
use crate::response::{Envelope, ResponseCode};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::warn;

/// Request-scoped caller context. Always present downstream of the
/// guard; `None` means the request is unauthenticated.
#[derive(Debug, Clone)]
pub struct CallerContext(pub Option<AuthenticatedCaller>);

/// Guard middleware: extracts and verifies the bearer token if present,
/// swallowing (and logging) any failure.
pub async fn auth_guard(
    State(jwt): State<Arc<JwtHandler>>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|t| t.to_string());

    let caller = match token {
        Some(token) => match jwt.verify(&token) {
            Ok(claims) => AuthenticatedCaller::from_claims(&claims),
            Err(e) => {
                warn!("Rejected bearer token: {:#}", e);
                None
            }
        },
        None => None,
    };

    req.extensions_mut().insert(CallerContext(caller));
    next.run(req).await
}

/// Role gate for mutation endpoints: anonymous callers and standard
/// users are turned away with a 403 and the not-authorized code.
pub fn require_admin(ctx: &CallerContext) -> Result<&AuthenticatedCaller, Response> {
    match &ctx.0 {
        Some(caller) if caller.role == Role::Admin => Ok(caller),
        _ => {
            warn!("Unauthorized access to an admin endpoint");
            Err(forbidden())
        }
    }
}

/// Gate for endpoints that need any authenticated caller.
pub fn require_caller(ctx: &CallerContext) -> Result<&AuthenticatedCaller, Response> {
    match &ctx.0 {
        Some(caller) => Ok(caller),
        None => {
            warn!("Unauthorized access to a protected endpoint");
            Err(forbidden())
        }
    }
}

fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(Envelope::of(ResponseCode::NotAuthorized)),
    )
        .into_response()
}
