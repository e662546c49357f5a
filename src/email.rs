//! Outbound notification channel for delivering license keys.
//!
//! Delivery is advisory: the persisted record is the source of truth and a
//! failed send is logged and swallowed by the caller, never rolled back into
//! state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Fire-and-forget delivery sink for account-holder notifications.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn deliver(&self, email: &str, subject: &str, body: &str) -> Result<()>;
}

/// Format a Unix timestamp as a human-readable date (e.g., "Jan 15, 2024")
fn format_date(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%b %d, %Y").to_string())
        .unwrap_or_else(|| "Unknown date".to_string())
}

/// Compose the license-key email.
///
/// The plaintext key appears here and in the wire request to the notifier,
/// nowhere else.
pub fn license_key_message(
    full_name: &str,
    plan_name: &str,
    license_key: &str,
    expires_at: Option<i64>,
) -> (String, String) {
    let subject = format!("Your {} license key", plan_name);
    let valid_until = expires_at
        .map(format_date)
        .unwrap_or_else(|| "the end of your plan".to_string());
    let body = format!(
        "Hello {}!\n\n\
         Thank you for your purchase. Your license key is:\n\n\
         =========================================\n\
         LICENSE KEY: {}\n\
         =========================================\n\n\
         Plan: {}\n\
         Valid until: {}\n\n\
         Do not share this key.",
        full_name, license_key, plan_name, valid_until
    );
    (subject, body)
}

#[derive(Debug, Serialize)]
struct ResendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResendEmailResponse {
    #[allow(dead_code)]
    id: String,
}

/// Notification channel backed by the Resend API.
#[derive(Clone)]
pub struct ResendNotifier {
    api_key: Option<String>,
    from_email: String,
    http_client: Client,
}

impl ResendNotifier {
    pub fn new(api_key: Option<String>, from_email: String) -> Self {
        Self {
            api_key,
            from_email,
            http_client: Client::new(),
        }
    }
}

#[async_trait]
impl NotificationChannel for ResendNotifier {
    async fn deliver(&self, email: &str, subject: &str, body: &str) -> Result<()> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!(to = %email, "no notification API key configured, cannot deliver");
            return Err(AppError::Internal(
                "notification channel not configured".into(),
            ));
        };

        let request = ResendEmailRequest {
            from: &self.from_email,
            to: vec![email],
            subject,
            text: body,
        };

        let response = self
            .http_client
            .post(RESEND_API_URL)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "failed to reach notification API");
                AppError::Internal(format!("notification send error: {}", e))
            })?;

        if response.status().is_success() {
            let _result: ResendEmailResponse = response.json().await.map_err(|e| {
                tracing::error!(error = %e, "failed to parse notification API response");
                AppError::Internal("notification response error".into())
            })?;
            tracing::info!(to = %email, "license key email sent");
            Ok(())
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %text, "notification API returned error");
            Err(AppError::Internal(format!(
                "notification send failed: {}",
                status
            )))
        }
    }
}
