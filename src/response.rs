//! Response envelope shared by every endpoint.
//!
//! Success and failure both travel in the same fixed-shape wrapper; the
//! `responseCode` field carries a short wire code that existing clients
//! switch on, so the codes here must stay stable.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;
use serde_json::Value;

/// Wire codes understood by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Success,
    Failed,
    SystemError,
    Error,
    EmailExists,
    UsernameExists,
    BadCredentials,
    UserNotFound,
    InvalidToken,
    NotAuthorized,
}

impl ResponseCode {
    pub fn code(&self) -> &'static str {
        match self {
            ResponseCode::Success => "000",
            ResponseCode::Failed => "002",
            ResponseCode::SystemError => "E06",
            ResponseCode::Error => "EE1",
            ResponseCode::EmailExists => "E12",
            ResponseCode::UsernameExists => "EC003",
            ResponseCode::BadCredentials => "EC001",
            ResponseCode::UserNotFound => "EC002",
            ResponseCode::InvalidToken => "EC004",
            ResponseCode::NotAuthorized => "E40",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ResponseCode::Success => "Successful",
            ResponseCode::Failed => "Failed",
            ResponseCode::SystemError => "A system error has occurred",
            ResponseCode::Error => "An error has occurred",
            ResponseCode::EmailExists => "A user with this email already exists",
            ResponseCode::UsernameExists => "This username is already taken",
            ResponseCode::BadCredentials => "Invalid username or password",
            ResponseCode::UserNotFound => "User not found",
            ResponseCode::InvalidToken => "Invalid or expired token",
            ResponseCode::NotAuthorized => "You are not authorized to perform this action",
        }
    }
}

/// The fixed-shape response wrapper.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub response_code: String,
    pub response_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<Value>,
}

impl Envelope {
    pub fn of(code: ResponseCode) -> Self {
        Self {
            response_code: code.code().to_string(),
            response_message: code.message().to_string(),
            error_message: None,
            info: None,
        }
    }

    pub fn of_message(code: ResponseCode, message: &str) -> Self {
        Self {
            response_code: code.code().to_string(),
            response_message: message.to_string(),
            error_message: None,
            info: None,
        }
    }

    pub fn success<T: Serialize>(info: T) -> Self {
        let mut env = Self::of(ResponseCode::Success);
        env.info = serde_json::to_value(info).ok();
        env
    }

    /// Validation failure: a field -> message map in `errorMessage`.
    pub fn validation(errors: Value) -> Self {
        let mut env = Self::of(ResponseCode::Failed);
        env.response_message = ResponseCode::Error.message().to_string();
        env.error_message = Some(errors);
        env
    }

}

// Failures ride in a 200 by policy; only role-gate rejections (403) and
// unexpected errors (500) use transport-level statuses, mapped at the
// handler where they occur.
impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
