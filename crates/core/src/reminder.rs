//! Reminder domain types.
//!
//! Reminders are owned by the external store; the core references them by id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// How often a reminder repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Frequency {
    Daily,
    Weekly,
    #[default]
    #[serde(rename = "One-time")]
    OneTime,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => write!(f, "Daily"),
            Frequency::Weekly => write!(f, "Weekly"),
            Frequency::OneTime => write!(f, "One-time"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    #[default]
    Active,
    Completed,
    Missed,
}

/// A reminder record as the store holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub title: String,
    /// Canonical `"H:MM AM/PM"` time of day.
    pub time: String,
    pub frequency: Frequency,
    pub status: ReminderStatus,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a reminder; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReminder {
    pub title: String,
    pub time: String,
    pub frequency: Frequency,
}

/// Partial update applied to an existing reminder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReminderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ReminderStatus>,
}

/// One row of the derived today-schedule view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: Uuid,
    pub time: String,
    pub task: String,
    pub frequency: Frequency,
    pub status: ReminderStatus,
}
