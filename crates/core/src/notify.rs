//! Notification and activity-log collaborator contracts.
//!
//! Both are fire-and-forget from the core's perspective: failures are logged,
//! never allowed to fail a dialogue turn.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A caregiver-facing alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRequest {
    pub title: String,
    pub severity: Severity,
    pub description: String,
}

/// An outbound email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Category tag for activity-feed entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityKind {
    Reminder,
    Emergency,
    Notification,
    FaceRecognition,
    EmotionDetection,
    Interaction,
}

/// One user-visible event for the caregiver activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub icon: String,
    pub title: String,
    pub description: String,
    pub kind: ActivityKind,
}

impl ActivityEvent {
    pub fn new(
        icon: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        kind: ActivityKind,
    ) -> Self {
        Self {
            icon: icon.into(),
            title: title.into(),
            description: description.into(),
            kind,
        }
    }
}

/// Contract for the outbound notification collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_alert(&self, alert: AlertRequest) -> anyhow::Result<()>;
    async fn send_email(&self, email: Email) -> anyhow::Result<()>;
}

/// Contract for the activity-log collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn append(&self, event: ActivityEvent) -> anyhow::Result<()>;
}
