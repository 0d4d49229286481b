//! JWT issuance and verification.

use crate::auth::models::{Claims, User};
use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

/// Signing key plus token lifetime; shared across the app via `Arc`.
pub struct JwtHandler {
    secret: String,
    ttl_hours: i64,
}

impl JwtHandler {
    pub fn new(secret: String, ttl_hours: i64) -> Self {
        Self { secret, ttl_hours }
    }

    /// Mint a signed token for a user. Returns the token and its
    /// lifetime in seconds.
    pub fn issue(&self, user: &User) -> Result<(String, usize)> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(chrono::Duration::hours(self.ttl_hours))
            .context("Invalid timestamp")?
            .timestamp() as usize;

        let expires_in = (self.ttl_hours * 3600) as usize;

        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role,
            email: user.email.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.full_name(),
            iat: now.timestamp() as usize,
            exp: expiration,
        };

        debug!(
            "Issuing JWT for user {} ({}), expires in {}h",
            user.username, user.id, self.ttl_hours
        );

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("Failed to issue JWT")?;

        Ok((token, expires_in))
    }

    /// Verify signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .context("Invalid or expired token")?;

        debug!("Verified JWT for user {}", decoded.claims.username);

        Ok(decoded.claims)
    }

    pub fn ttl_hours(&self) -> i64 {
        self.ttl_hours
    }
}
