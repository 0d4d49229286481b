//! Best-effort outbound mail.
//!
//! Onboarding mails are posted to an HTTP relay when one is configured,
//! otherwise logged and dropped. Delivery failure is never surfaced to
//! the caller; registration must not fail because a mail bounced.

use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct Email {
    pub recipient: String,
    pub subject: String,
    pub body_html: String,
}

#[derive(Clone)]
pub struct Mailer {
    client: reqwest::Client,
    relay_url: Option<String>,
    sender: String,
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

impl Mailer {
    pub fn new(client: reqwest::Client, relay_url: Option<String>, sender: String) -> Self {
        Self {
            client,
            relay_url,
            sender,
        }
    }

    pub async fn send(&self, email: Email) {
        let Some(relay_url) = &self.relay_url else {
            info!(
                recipient = %email.recipient,
                subject = %email.subject,
                "No mail relay configured, dropping onboarding mail"
            );
            return;
        };

        let payload = RelayPayload {
            from: &self.sender,
            to: &email.recipient,
            subject: &email.subject,
            html: &email.body_html,
        };

        match self.client.post(relay_url).json(&payload).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!(recipient = %email.recipient, "Onboarding mail dispatched");
            }
            Ok(resp) => {
                warn!(
                    recipient = %email.recipient,
                    status = %resp.status(),
                    "Mail relay rejected onboarding mail"
                );
            }
            Err(e) => {
                warn!(recipient = %email.recipient, error = %e, "Failed to reach mail relay");
            }
        }
    }
}

pub const USER_ONBOARDING_SUBJECT: &str = "BOOK MANAGER: USER ONBOARDING MAIL";
pub const ADMIN_ONBOARDING_SUBJECT: &str = "BOOK MANAGER: ADMIN ONBOARDING MAIL";

pub fn user_onboarding_body(first_name: &str, base_url: &str) -> String {
    format!(
        "<html><body>\
         <h2>Welcome to BookStack!</h2>\
         <p>Hi <strong>{first_name}</strong>,</p>\
         <p>We're excited to have you on board. Your account has been successfully \
         created and you're now part of our growing community.</p>\
         <p>You can now start exploring, saving, and managing books easily.</p>\
         <a href=\"{base_url}/users/auth/login\">Get Started</a>\
         <p>If you did not sign up for this service, please ignore this email.</p>\
         </body></html>"
    )
}

pub fn admin_onboarding_body(first_name: &str, base_url: &str, user_id: &str) -> String {
    format!(
        "<html><body>\
         <h2>Welcome to BookStack!</h2>\
         <p>Hi <strong>{first_name}</strong>,</p>\
         <p>We're excited to have you on board. Your account has been successfully \
         created and you're now part of our growing community.</p>\
         <p>Go ahead and click the link to activate your account as an admin, then login.</p>\
         <a href=\"{base_url}/users/auth/register/admin/activate?id={user_id}\">\
         Activate this account</a>\
         <p>If you did not sign up as an admin for this service, please ignore this email.</p>\
         </body></html>"
    )
}
