//! HTTP payloads and the records kept by the in-memory backends.

use chrono::{DateTime, Utc};
use memora_core::notify::{ActivityKind, Severity};
use memora_core::reminder::{Frequency, Reminder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReminderPayload {
    pub title: String,
    pub time: String,
    #[serde(default)]
    pub frequency: Option<Frequency>,
}

/// Targets a reminder by id, or by title when the id is unknown.
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteReminderPayload {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CompleteReminderResponse {
    pub ok: bool,
    pub reminder: Reminder,
}

/// A stored caregiver alert, newest first in the outbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAlert {
    pub id: Uuid,
    pub title: String,
    pub severity: Severity,
    pub description: String,
    pub time: DateTime<Utc>,
}

/// A stored outbound email, newest first in the outbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEmail {
    pub id: Uuid,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub time: DateTime<Utc>,
}

/// One entry of the caregiver activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: Uuid,
    pub icon: String,
    pub title: String,
    pub description: String,
    pub kind: ActivityKind,
    pub time: DateTime<Utc>,
}

/// A family-roster member the face matcher can resolve to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyMember {
    pub name: String,
    pub relation: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub training_images: Vec<String>,
}

/// An unrecognized face captured for caregiver review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnknownFace {
    pub id: Uuid,
    pub image_data: String,
    pub captured_at: DateTime<Utc>,
}
