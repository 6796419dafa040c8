//! Operator notifications
//!
//! Notifications are a side channel. A failed delivery is logged by
//! [`deliver`] and never reaches the traversal.

mod reporter;
mod webhook;

pub use reporter::Reporter;
pub use webhook::WebhookNotifier;

use crate::config::NotifierConfig;
use crate::HarvestError;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// A message for the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Delivers notifications to an operator
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn report_now(&self, notification: &Notification) -> Result<(), HarvestError>;
}

/// Writes notifications to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn report_now(&self, notification: &Notification) -> Result<(), HarvestError> {
        tracing::info!(
            subject = %notification.subject,
            "Notification: {}",
            notification.body
        );
        Ok(())
    }
}

/// Sends `notification`, logging and discarding any delivery failure
pub async fn deliver(notifier: &dyn Notifier, notification: &Notification) {
    if let Err(e) = notifier.report_now(notification).await {
        tracing::warn!(
            subject = %notification.subject,
            "Failed to deliver notification: {}",
            e
        );
    }
}

/// Builds the notifier the config asks for
///
/// A webhook URL selects [`WebhookNotifier`]; otherwise notifications go to the log.
pub fn from_config(config: &NotifierConfig) -> Result<Arc<dyn Notifier>, HarvestError> {
    match &config.webhook_url {
        Some(url) => Ok(Arc::new(WebhookNotifier::new(url)?)),
        None => Ok(Arc::new(LogNotifier)),
    }
}
