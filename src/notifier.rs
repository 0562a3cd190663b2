// src/notifier.rs
//
// Outbound alerting. Notification is best-effort and fully decoupled
// from persistence: a failed send is logged by the caller and never
// rolls back the violation record.

use crate::error::NotifyError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::info;

/// Fixed reference link embedded in every alert; points the owner at
/// the violation dashboard.
const REFERENCE_LINK: &str = "https://gnss-trafficviolation.web.app/violations";

pub fn alert_message(plate: &str) -> String {
    format!(
        "No-parking violation recorded for vehicle {plate}. Details: {REFERENCE_LINK}"
    )
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, address: &str, body: &str) -> Result<(), NotifyError>;
}

/// SMS gateway adapter. Gateway URL and credentials come from the
/// environment, outside core scope.
pub struct SmsNotifier {
    client: reqwest::Client,
    gateway_url: String,
    auth_token: String,
    sender_id: String,
}

impl SmsNotifier {
    pub fn from_env() -> Result<Self> {
        let gateway_url =
            std::env::var("SMS_GATEWAY_URL").context("SMS_GATEWAY_URL is not set")?;
        let auth_token = std::env::var("SMS_AUTH_TOKEN").context("SMS_AUTH_TOKEN is not set")?;
        let sender_id = std::env::var("SMS_SENDER_ID").unwrap_or_else(|_| "PARKWATCH".to_string());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            gateway_url,
            auth_token,
            sender_id,
        })
    }
}

#[async_trait]
impl Notifier for SmsNotifier {
    async fn notify(&self, address: &str, body: &str) -> Result<(), NotifyError> {
        let payload = json!({
            "to": address,
            "from": self.sender_id,
            "body": body,
        });
        let response = self
            .client
            .post(&self.gateway_url)
            .bearer_auth(&self.auth_token)
            .json(&payload)
            .send()
            .await
            .map_err(|err| NotifyError(err.to_string()))?;
        if !response.status().is_success() {
            return Err(NotifyError(format!("gateway HTTP {}", response.status())));
        }
        Ok(())
    }
}

/// Dry-run notifier for local development: logs the alert instead of
/// sending it.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, address: &str, body: &str) -> Result<(), NotifyError> {
        info!("sms (dry-run) to {address}: {body}");
        Ok(())
    }
}
