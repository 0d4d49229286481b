//! Authentication endpoints.

use crate::auth::middleware::{require_caller, CallerContext};
use crate::auth::models::{EditProfileRequest, LoginRequest, RegisterRequest};
use crate::auth::service::{AuthService, LoginError, PromoteOutcome, RegisterOutcome};
use crate::response::{Envelope, ResponseCode};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Login - POST /users/auth/login
pub async fn login(
    State(service): State<Arc<AuthService>>,
    Json(payload): Json<LoginRequest>,
) -> Response {
    info!("Login attempt - Username: {}", payload.username);

    match service.login(&payload.username, &payload.password) {
        Ok(profile) => Envelope::success(profile).into_response(),
        Err(LoginError::BadCredentials) => {
            Envelope::of(ResponseCode::BadCredentials).into_response()
        }
        Err(LoginError::UserNotFound) => Envelope::of(ResponseCode::UserNotFound).into_response(),
        Err(LoginError::Internal(e)) => {
            error!("Error during login: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Envelope::of(ResponseCode::SystemError)),
            )
                .into_response()
        }
    }
}

/// Register - POST /users/auth/register
pub async fn register(
    State(service): State<Arc<AuthService>>,
    Json(payload): Json<RegisterRequest>,
) -> Response {
    register_inner(service, payload, false)
}

/// Register with the admin onboarding flow - POST /users/auth/register/admin
pub async fn register_admin(
    State(service): State<Arc<AuthService>>,
    Json(payload): Json<RegisterRequest>,
) -> Response {
    register_inner(service, payload, true)
}

fn register_inner(service: Arc<AuthService>, payload: RegisterRequest, as_admin: bool) -> Response {
    if let Some(errors) = validate_registration(&payload) {
        return Envelope::validation(errors).into_response();
    }

    match service.register(&payload, as_admin) {
        Ok(RegisterOutcome::Created) => {
            Envelope::of_message(ResponseCode::Success, "Registration successful").into_response()
        }
        Ok(RegisterOutcome::EmailExists) => {
            Envelope::of(ResponseCode::EmailExists).into_response()
        }
        Ok(RegisterOutcome::UsernameExists) => {
            Envelope::of(ResponseCode::UsernameExists).into_response()
        }
        Err(e) => {
            error!("Error during registration: {:#}", e);
            Envelope::of(ResponseCode::SystemError).into_response()
        }
    }
}

fn validate_registration(payload: &RegisterRequest) -> Option<Value> {
    let mut errors = Map::new();
    let mut check = |field: &str, value: &str, message: &str| {
        if value.trim().is_empty() {
            errors.insert(field.to_string(), Value::String(message.to_string()));
        }
    };
    check("firstName", &payload.first_name, "First name is required");
    check("lastName", &payload.last_name, "Last name is required");
    check("email", &payload.email, "Email is required");
    check("username", &payload.username, "Username is required");
    check("password", &payload.password, "Password is required");

    if errors.is_empty() {
        None
    } else {
        Some(Value::Object(errors))
    }
}

#[derive(Debug, Deserialize)]
pub struct ActivateParams {
    pub id: Uuid,
}

/// Admin activation - GET /users/auth/register/admin/activate?id=<id>
pub async fn activate_admin(
    State(service): State<Arc<AuthService>>,
    Query(params): Query<ActivateParams>,
) -> Response {
    match service.promote_to_admin(&params.id) {
        Ok(PromoteOutcome::Promoted) => {
            Envelope::of_message(ResponseCode::Success, "User made an admin successfully")
                .into_response()
        }
        Ok(PromoteOutcome::NotFound) => Envelope::of(ResponseCode::Failed).into_response(),
        Err(e) => {
            error!("Error during admin activation: {:#}", e);
            Envelope::of(ResponseCode::SystemError).into_response()
        }
    }
}

/// Profile update - PUT /users/update (any authenticated caller)
pub async fn update_profile(
    State(service): State<Arc<AuthService>>,
    Extension(ctx): Extension<CallerContext>,
    Json(payload): Json<EditProfileRequest>,
) -> Response {
    let caller = match require_caller(&ctx) {
        Ok(caller) => caller,
        Err(rejection) => return rejection,
    };

    match service.update_profile(&caller.id, &payload) {
        Ok(true) => {
            Envelope::of_message(ResponseCode::Success, "Update successful").into_response()
        }
        Ok(false) => Envelope::of(ResponseCode::Failed).into_response(),
        Err(e) => {
            error!("Error during profile update: {:#}", e);
            Envelope::of(ResponseCode::SystemError).into_response()
        }
    }
}
