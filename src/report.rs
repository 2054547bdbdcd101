use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::delivery::Notification;

/// What a replay did, for the terminal summary or JSON export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayReport {
    pub scenario: String,
    pub delivered_to: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub events_applied: usize,
    pub notifications: Vec<SentNotification>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentNotification {
    #[serde(flatten)]
    pub notification: Notification,
    pub urgent: bool,
}

impl ReplayReport {
    pub fn view_notifications(&self) -> usize {
        self.notifications
            .iter()
            .filter(|sent| sent.notification.text.starts_with("view/"))
            .count()
    }

    pub fn build_notifications(&self) -> usize {
        self.notifications.len() - self.view_notifications()
    }
}
