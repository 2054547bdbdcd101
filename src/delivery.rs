use std::sync::{Mutex, PoisonError};

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::error::{HeraldError, Result};
use crate::output::{bright_red, dim, outcome_marker};

/// A message ready to be delivered, plus the attachment metadata chat
/// backends render next to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub run_name: String,
    pub run_url: String,
    pub text: String,
    pub color: String,
}

/// Sends notifications somewhere. Implementations must not retry.
pub trait Delivery: Send + Sync {
    fn send(&self, notification: &Notification, urgent: bool) -> Result<()>;

    /// Where notifications go, for log lines.
    fn describe(&self) -> String;
}

/// Rocket.Chat incoming-webhook transport.
pub struct WebhookClient {
    client: Client,
    webhook: Url,
}

impl WebhookClient {
    pub fn new(webhook: &str) -> Result<Self> {
        if webhook.trim().is_empty() {
            return Err(HeraldError::Config("No webhook URL provided".to_string()));
        }

        let webhook = Url::parse(webhook.trim())
            .map_err(|e| HeraldError::Config(format!("Invalid webhook URL: {e}")))?;

        let client = Client::builder()
            .user_agent(concat!("buildherald/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HeraldError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, webhook })
    }

    fn payload(notification: &Notification, urgent: bool) -> serde_json::Value {
        let text = if urgent {
            format!("@all {}", notification.text)
        } else {
            notification.text.clone()
        };

        json!({
            "text": text,
            "attachments": [{
                "title": notification.run_name,
                "title_link": notification.run_url,
                "text": notification.text,
                "color": notification.color,
            }]
        })
    }
}

impl Delivery for WebhookClient {
    fn send(&self, notification: &Notification, urgent: bool) -> Result<()> {
        let response = self
            .client
            .post(self.webhook.clone())
            .json(&Self::payload(notification, urgent))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(HeraldError::Delivery {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }

    fn describe(&self) -> String {
        self.webhook.to_string()
    }
}

/// Prints notifications instead of sending them.
#[derive(Debug, Default)]
pub struct ConsoleDelivery;

impl Delivery for ConsoleDelivery {
    fn send(&self, notification: &Notification, urgent: bool) -> Result<()> {
        let marker = if urgent {
            bright_red("@all").to_string()
        } else {
            String::new()
        };
        println!(
            "{} {marker} {}",
            outcome_marker(&notification.color),
            notification.text
        );
        println!("   {}", dim(&notification.run_url));
        Ok(())
    }

    fn describe(&self) -> String {
        "console".to_string()
    }
}

/// Keeps every notification in memory; used by replays to build a report.
#[derive(Debug, Default)]
pub struct RecordingDelivery {
    sent: Mutex<Vec<(Notification, bool)>>,
}

impl RecordingDelivery {
    pub fn sent(&self) -> Vec<(Notification, bool)> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Delivery for RecordingDelivery {
    fn send(&self, notification: &Notification, urgent: bool) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((notification.clone(), urgent));
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Hands each notification to the inner transport and records it when the
/// transport accepted it.
pub struct Tee<D> {
    inner: D,
    record: RecordingDelivery,
}

impl<D: Delivery> Tee<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            record: RecordingDelivery::default(),
        }
    }

    pub fn sent(&self) -> Vec<(Notification, bool)> {
        self.record.sent()
    }
}

impl<D: Delivery> Delivery for Tee<D> {
    fn send(&self, notification: &Notification, urgent: bool) -> Result<()> {
        self.inner.send(notification, urgent)?;
        self.record.send(notification, urgent)
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}
