//! Application configuration loaded from the environment.

use anyhow::Result;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// Base URL embedded in onboarding mails (activation link).
    pub public_base_url: String,
    /// Optional HTTP mail relay; mails are logged and dropped when unset.
    pub mail_relay_url: Option<String>,
    pub mail_sender: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let database_path =
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| "./bookstack.db".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let jwt_secret = std::env::var("JWT_SECRET")
            .unwrap_or_else(|_| "change-me-in-production".to_string());

        let token_ttl_hours = std::env::var("JWT_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(24);

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"));

        let mail_relay_url = std::env::var("MAIL_RELAY_URL").ok();

        let mail_sender = std::env::var("MAIL_SENDER")
            .unwrap_or_else(|_| "no-reply@bookstack.local".to_string());

        Ok(Self {
            database_path,
            port,
            jwt_secret,
            token_ttl_hours,
            public_base_url,
            mail_relay_url,
            mail_sender,
        })
    }
}
