//! Authentication service: credential checks, registration, role changes.

use crate::auth::jwt::JwtHandler;
use crate::auth::models::{
    AccountStatus, EditProfileRequest, LoginProfile, RegisterRequest, Role, User,
    TIMESTAMP_FORMAT,
};
use crate::auth::user_store::UserStore;
use crate::mail::{
    self, Email, Mailer, ADMIN_ONBOARDING_SUBJECT, USER_ONBOARDING_SUBJECT,
};
use anyhow::{Context, Result};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug)]
pub enum LoginError {
    UserNotFound,
    BadCredentials,
    Internal(anyhow::Error),
}

#[derive(Debug, PartialEq, Eq)]
pub enum RegisterOutcome {
    Created,
    EmailExists,
    UsernameExists,
}

/// Promotion reports not-found instead of swallowing it; the HTTP layer
/// still answers 200 either way for client compatibility.
#[derive(Debug, PartialEq, Eq)]
pub enum PromoteOutcome {
    Promoted,
    NotFound,
}

pub struct AuthService {
    users: Arc<UserStore>,
    jwt: Arc<JwtHandler>,
    mailer: Mailer,
    public_base_url: String,
}

impl AuthService {
    pub fn new(
        users: Arc<UserStore>,
        jwt: Arc<JwtHandler>,
        mailer: Mailer,
        public_base_url: String,
    ) -> Self {
        Self {
            users,
            jwt,
            mailer,
            public_base_url,
        }
    }

    /// Verify credentials, record the login, and mint a token.
    pub fn login(&self, username: &str, password: &str) -> Result<LoginProfile, LoginError> {
        let mut user = self
            .users
            .find_by_username(username)
            .map_err(LoginError::Internal)?
            .ok_or(LoginError::UserNotFound)?;

        let valid = verify(password, &user.password_hash)
            .context("Failed to verify password")
            .map_err(LoginError::Internal)?;
        if !valid {
            warn!("Failed login attempt: {}", username);
            return Err(LoginError::BadCredentials);
        }

        let now = Utc::now().naive_utc();
        // Only the first successful login stamps last_login.
        if user.last_login.is_none() {
            user.last_login = Some(now);
        }
        user.status = AccountStatus::Active;
        self.users.update(&user).map_err(LoginError::Internal)?;

        let (token, expires_in) = self.jwt.issue(&user).map_err(LoginError::Internal)?;
        let expiry = now + chrono::Duration::seconds(expires_in as i64);

        info!("Login successful: {} ({})", user.username, user.role.as_str());

        Ok(LoginProfile {
            user_id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            role: user.role,
            status: user.status,
            bearer_token: token,
            last_login_date: user
                .last_login
                .map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
            expiry_date: expiry.format(TIMESTAMP_FORMAT).to_string(),
        })
    }

    /// Register a new account. The role is always `user`; `as_admin`
    /// only picks the onboarding template, which carries the activation
    /// link that later escalates the role.
    pub fn register(&self, request: &RegisterRequest, as_admin: bool) -> Result<RegisterOutcome> {
        if self.users.exists_by_email(&request.email)? {
            return Ok(RegisterOutcome::EmailExists);
        }
        if self.users.exists_by_username(&request.username)? {
            return Ok(RegisterOutcome::UsernameExists);
        }

        let user = User {
            id: Uuid::new_v4(),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            email: request.email.clone(),
            username: request.username.clone(),
            password_hash: hash(&request.password, DEFAULT_COST)
                .context("Failed to hash password")?,
            role: Role::User,
            status: AccountStatus::Inactive,
            joined_on: Utc::now().naive_utc(),
            last_login: None,
        };

        self.users.insert(&user)?;

        let email = if as_admin {
            Email {
                recipient: user.email.clone(),
                subject: ADMIN_ONBOARDING_SUBJECT.to_string(),
                body_html: mail::admin_onboarding_body(
                    &user.first_name,
                    &self.public_base_url,
                    &user.id.to_string(),
                ),
            }
        } else {
            Email {
                recipient: user.email.clone(),
                subject: USER_ONBOARDING_SUBJECT.to_string(),
                body_html: mail::user_onboarding_body(&user.first_name, &self.public_base_url),
            }
        };

        // Best-effort: the registration response never waits on mail.
        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            mailer.send(email).await;
        });

        Ok(RegisterOutcome::Created)
    }

    /// Escalate a user to admin. Idempotent.
    pub fn promote_to_admin(&self, id: &Uuid) -> Result<PromoteOutcome> {
        info!("Trying to make user with id {} an admin", id);
        if self.users.set_role(id, Role::Admin)? {
            info!("User with id {} is now an admin", id);
            Ok(PromoteOutcome::Promoted)
        } else {
            warn!("Cannot promote unknown user id {}", id);
            Ok(PromoteOutcome::NotFound)
        }
    }

    /// Apply the non-blank fields of a profile edit. Returns false when
    /// the id does not exist.
    pub fn update_profile(&self, id: &Uuid, edits: &EditProfileRequest) -> Result<bool> {
        let Some(mut user) = self.users.find_by_id(id)? else {
            warn!("User not found for id: {}", id);
            return Ok(false);
        };

        if let Some(first_name) = non_blank(&edits.first_name) {
            user.first_name = first_name.to_string();
        }
        if let Some(last_name) = non_blank(&edits.last_name) {
            user.last_name = last_name.to_string();
        }
        if let Some(username) = non_blank(&edits.username) {
            user.username = username.to_string();
        }
        if let Some(password) = non_blank(&edits.password) {
            user.password_hash = hash(password, DEFAULT_COST).context("Failed to hash password")?;
        }

        self.users.update(&user)?;
        Ok(true)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn test_service() -> (AuthService, Arc<UserStore>, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let users = Arc::new(UserStore::new(temp_file.path().to_str().unwrap()).unwrap());
        let jwt = Arc::new(JwtHandler::new("test-secret".to_string(), 24));
        let mailer = Mailer::new(reqwest::Client::new(), None, "no-reply@test".to_string());
        let service = AuthService::new(
            users.clone(),
            jwt,
            mailer,
            "http://localhost:8080".to_string(),
        );
        (service, users, temp_file)
    }

    fn jdoe() -> RegisterRequest {
        RegisterRequest {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: "j@x.com".to_string(),
            username: "jdoe".to_string(),
            password: "P@ss1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login_roundtrip() {
        let (service, _users, _temp) = test_service();

        let outcome = service.register(&jdoe(), false).unwrap();
        assert_eq!(outcome, RegisterOutcome::Created);

        let profile = service.login("jdoe", "P@ss1").unwrap();
        assert!(!profile.bearer_token.is_empty());
        assert_eq!(profile.username, "jdoe");
        assert_eq!(profile.role, Role::User);
        assert_eq!(profile.status, AccountStatus::Active);
        assert!(profile.last_login_date.is_some());
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let (service, users, _temp) = test_service();
        service.register(&jdoe(), false).unwrap();

        let mut dup = jdoe();
        dup.username = "othername".to_string();
        assert_eq!(
            service.register(&dup, false).unwrap(),
            RegisterOutcome::EmailExists
        );
        // No second record was created
        assert!(!users.exists_by_username("othername").unwrap());
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let (service, _users, _temp) = test_service();
        service.register(&jdoe(), false).unwrap();

        let mut dup = jdoe();
        dup.email = "other@x.com".to_string();
        assert_eq!(
            service.register(&dup, false).unwrap(),
            RegisterOutcome::UsernameExists
        );
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let (service, _users, _temp) = test_service();
        service.register(&jdoe(), false).unwrap();

        match service.login("jdoe", "wrong") {
            Err(LoginError::BadCredentials) => {}
            other => panic!("expected BadCredentials, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_login_unknown_username() {
        let (service, _users, _temp) = test_service();
        match service.login("ghost", "P@ss1") {
            Err(LoginError::UserNotFound) => {}
            other => panic!("expected UserNotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_token_claims_match_stored_user() {
        let (service, users, _temp) = test_service();
        service.register(&jdoe(), false).unwrap();
        let profile = service.login("jdoe", "P@ss1").unwrap();

        let jwt = JwtHandler::new("test-secret".to_string(), 24);
        let claims = jwt.verify(&profile.bearer_token).unwrap();
        let stored = users.find_by_username("jdoe").unwrap().unwrap();

        assert_eq!(claims.sub, stored.id.to_string());
        assert_eq!(claims.username, stored.username);
        assert_eq!(claims.email, stored.email);
        assert_eq!(claims.role, stored.role);
        assert_eq!(claims.full_name, "Jane Doe");
    }

    #[tokio::test]
    async fn test_first_login_only_sets_last_login() {
        let (service, users, _temp) = test_service();
        service.register(&jdoe(), false).unwrap();

        service.login("jdoe", "P@ss1").unwrap();
        let first = users.find_by_username("jdoe").unwrap().unwrap().last_login;
        assert!(first.is_some());

        service.login("jdoe", "P@ss1").unwrap();
        let second = users.find_by_username("jdoe").unwrap().unwrap().last_login;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_register_as_admin_still_creates_standard_user() {
        let (service, users, _temp) = test_service();
        service.register(&jdoe(), true).unwrap();

        let stored = users.find_by_username("jdoe").unwrap().unwrap();
        assert_eq!(stored.role, Role::User);
    }

    #[tokio::test]
    async fn test_promote_to_admin_idempotent() {
        let (service, users, _temp) = test_service();
        service.register(&jdoe(), true).unwrap();
        let id = users.find_by_username("jdoe").unwrap().unwrap().id;

        assert_eq!(
            service.promote_to_admin(&id).unwrap(),
            PromoteOutcome::Promoted
        );
        assert_eq!(
            service.promote_to_admin(&id).unwrap(),
            PromoteOutcome::Promoted
        );
        assert_eq!(
            users.find_by_id(&id).unwrap().unwrap().role,
            Role::Admin
        );

        assert_eq!(
            service.promote_to_admin(&Uuid::new_v4()).unwrap(),
            PromoteOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_update_profile_touches_only_non_blank_fields() {
        let (service, users, _temp) = test_service();
        service.register(&jdoe(), false).unwrap();
        let id = users.find_by_username("jdoe").unwrap().unwrap().id;

        let edits = EditProfileRequest {
            first_name: Some("Janet".to_string()),
            last_name: Some("   ".to_string()), // blank, ignored
            username: None,
            password: None,
        };
        assert!(service.update_profile(&id, &edits).unwrap());

        let stored = users.find_by_id(&id).unwrap().unwrap();
        assert_eq!(stored.first_name, "Janet");
        assert_eq!(stored.last_name, "Doe");
        assert_eq!(stored.username, "jdoe");

        // Unknown id reports not-found
        assert!(!service
            .update_profile(&Uuid::new_v4(), &EditProfileRequest::default())
            .unwrap());
    }
}
