//! Webhook delivery of notifications
//!
//! Each notification is POSTed as `{"subject": ..., "body": ...}`. Any
//! non-2xx answer counts as a failed delivery.

use crate::notify::{Notification, Notifier};
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Posts notifications as JSON to a webhook
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    endpoint: Url,
}

impl WebhookNotifier {
    pub fn new(endpoint: &str) -> Result<Self, HarvestError> {
        let endpoint = Url::parse(endpoint)?;
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn report_now(&self, notification: &Notification) -> Result<(), HarvestError> {
        tracing::info!("Sending notification '{}' to webhook", notification.subject);

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(notification)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Webhook delivery failed {}: {}", status, body);
            return Err(HarvestError::Notify(format!(
                "webhook returned {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}
