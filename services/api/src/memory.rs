//! In-memory implementations of the core collaborator traits.
//!
//! Everything here lives for the life of the process. Lists are kept newest
//! first, matching how the caregiver dashboard reads them.

use crate::models::{ActivityRecord, FamilyMember, StoredAlert, StoredEmail, UnknownFace};
use async_trait::async_trait;
use chrono::Utc;
use memora_core::faces::{FaceMatcher, RecognizedPerson};
use memora_core::notify::{ActivityEvent, ActivityKind, ActivityLog, AlertRequest, Email, Notifier};
use memora_core::reminder::{NewReminder, Reminder, ReminderPatch, ReminderStatus, ScheduleEntry};
use memora_core::store::{CompletionTarget, ReminderStore, StoreError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Capped, newest-first caregiver activity feed.
pub struct ActivityFeed {
    events: RwLock<Vec<ActivityRecord>>,
    cap: usize,
}

impl ActivityFeed {
    pub fn new() -> Self {
        Self::with_capacity(200)
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            cap,
        }
    }

    pub async fn snapshot(&self) -> Vec<ActivityRecord> {
        self.events.read().await.clone()
    }
}

impl Default for ActivityFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActivityLog for ActivityFeed {
    async fn append(&self, event: ActivityEvent) -> anyhow::Result<()> {
        let mut events = self.events.write().await;
        events.insert(
            0,
            ActivityRecord {
                id: Uuid::new_v4(),
                icon: event.icon,
                title: event.title,
                description: event.description,
                kind: event.kind,
                time: Utc::now(),
            },
        );
        events.truncate(self.cap);
        Ok(())
    }
}

/// Alert and email outbox. Sends never leave the process; the dashboard
/// reads them back out.
pub struct Outbox {
    alerts: RwLock<Vec<StoredAlert>>,
    emails: RwLock<Vec<StoredEmail>>,
    activity: Arc<ActivityFeed>,
}

impl Outbox {
    pub fn new(activity: Arc<ActivityFeed>) -> Self {
        Self {
            alerts: RwLock::new(Vec::new()),
            emails: RwLock::new(Vec::new()),
            activity,
        }
    }

    pub async fn alerts_snapshot(&self) -> Vec<StoredAlert> {
        self.alerts.read().await.clone()
    }

    pub async fn emails_snapshot(&self) -> Vec<StoredEmail> {
        self.emails.read().await.clone()
    }
}

#[async_trait]
impl Notifier for Outbox {
    async fn send_alert(&self, alert: AlertRequest) -> anyhow::Result<()> {
        self.alerts.write().await.insert(
            0,
            StoredAlert {
                id: Uuid::new_v4(),
                title: alert.title.clone(),
                severity: alert.severity,
                description: alert.description.clone(),
                time: Utc::now(),
            },
        );
        self.activity
            .append(ActivityEvent::new(
                "⚠️",
                alert.title,
                alert.description,
                ActivityKind::Emergency,
            ))
            .await
    }

    async fn send_email(&self, email: Email) -> anyhow::Result<()> {
        self.emails.write().await.insert(
            0,
            StoredEmail {
                id: Uuid::new_v4(),
                to: email.to.clone(),
                subject: email.subject.clone(),
                body: email.body,
                time: Utc::now(),
            },
        );
        self.activity
            .append(ActivityEvent::new(
                "✉️",
                format!("Email sent to {}", email.to),
                email.subject,
                ActivityKind::Notification,
            ))
            .await
    }
}

/// Minutes since midnight for a canonical `"H:MM AM/PM"` label. Unparseable
/// labels sort last.
fn time_sort_key(time: &str) -> u32 {
    let Some((clock, meridiem)) = time.split_once(' ') else {
        return u32::MAX;
    };
    let Some((hours, minutes)) = clock.split_once(':') else {
        return u32::MAX;
    };
    let (Ok(hours), Ok(minutes)) = (hours.parse::<u32>(), minutes.parse::<u32>()) else {
        return u32::MAX;
    };
    let hours = match (hours, meridiem) {
        (12, "AM") => 0,
        (12, "PM") => 12,
        (h, "PM") => h + 12,
        (h, _) => h,
    };
    hours * 60 + minutes
}

/// In-memory reminder store. Completion by title is case-insensitive and
/// skips already-completed reminders, so repeat titles resolve to the still
/// active one.
pub struct MemoryStore {
    reminders: RwLock<Vec<Reminder>>,
    activity: Arc<ActivityFeed>,
}

impl MemoryStore {
    pub fn new(activity: Arc<ActivityFeed>) -> Self {
        Self {
            reminders: RwLock::new(Vec::new()),
            activity,
        }
    }

    pub async fn all(&self) -> Vec<Reminder> {
        self.reminders.read().await.clone()
    }

    pub async fn get(&self, id: Uuid) -> Option<Reminder> {
        self.reminders.read().await.iter().find(|r| r.id == id).cloned()
    }
}

#[async_trait]
impl ReminderStore for MemoryStore {
    async fn create(&self, reminder: NewReminder) -> Result<Reminder, StoreError> {
        let created = Reminder {
            id: Uuid::new_v4(),
            title: reminder.title,
            time: reminder.time,
            frequency: reminder.frequency,
            status: ReminderStatus::Active,
            created_at: Utc::now(),
        };
        self.reminders.write().await.insert(0, created.clone());
        let _ = self
            .activity
            .append(ActivityEvent::new(
                "🔔",
                format!("Reminder created: {}", created.title),
                format!("Scheduled at {} ({})", created.time, created.frequency),
                ActivityKind::Reminder,
            ))
            .await;
        Ok(created)
    }

    async fn update(
        &self,
        id: Uuid,
        patch: ReminderPatch,
    ) -> Result<Option<Reminder>, StoreError> {
        let mut reminders = self.reminders.write().await;
        let Some(reminder) = reminders.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        if let Some(title) = patch.title {
            reminder.title = title;
        }
        if let Some(time) = patch.time {
            reminder.time = time;
        }
        if let Some(frequency) = patch.frequency {
            reminder.frequency = frequency;
        }
        if let Some(status) = patch.status {
            reminder.status = status;
        }
        Ok(Some(reminder.clone()))
    }

    async fn complete(&self, target: CompletionTarget) -> Result<Option<Reminder>, StoreError> {
        let mut reminders = self.reminders.write().await;
        let found = match &target {
            CompletionTarget::Id(id) => reminders.iter_mut().find(|r| r.id == *id),
            CompletionTarget::Title(title) => {
                let wanted = title.trim().to_lowercase();
                reminders.iter_mut().find(|r| {
                    r.status != ReminderStatus::Completed && r.title.to_lowercase() == wanted
                })
            }
        };
        let Some(reminder) = found else {
            return Ok(None);
        };
        reminder.status = ReminderStatus::Completed;
        let completed = reminder.clone();
        drop(reminders);
        let _ = self
            .activity
            .append(ActivityEvent::new(
                "✅",
                format!("Reminder completed: {}", completed.title),
                completed.time.clone(),
                ActivityKind::Reminder,
            ))
            .await;
        Ok(Some(completed))
    }

    async fn list(&self, status: ReminderStatus) -> Result<Vec<Reminder>, StoreError> {
        Ok(self
            .reminders
            .read()
            .await
            .iter()
            .filter(|r| r.status == status)
            .cloned()
            .collect())
    }

    async fn schedule_today(&self) -> Result<Vec<ScheduleEntry>, StoreError> {
        let mut entries: Vec<ScheduleEntry> = self
            .reminders
            .read()
            .await
            .iter()
            .map(|r| ScheduleEntry {
                id: r.id,
                time: r.time.clone(),
                task: r.title.clone(),
                frequency: r.frequency,
                status: r.status,
            })
            .collect();
        entries.sort_by_key(|e| time_sort_key(&e.time));
        Ok(entries)
    }
}

fn hash_prefix(s: &str) -> u32 {
    s.chars()
        .take(500)
        .fold(0u32, |h, c| h.wrapping_mul(31).wrapping_add(c as u32))
}

/// Face matcher backed by the family roster.
///
/// Webcam captures arrive as data URLs; a stable hash of the prefix picks a
/// member (or nobody) deterministically. Training-image paths resolve by
/// path match, and anything else rotates through the roster.
pub struct RosterMatcher {
    family: RwLock<Vec<FamilyMember>>,
    unknown: RwLock<Vec<UnknownFace>>,
    rotate: AtomicUsize,
}

impl RosterMatcher {
    pub fn new(family: Vec<FamilyMember>) -> Self {
        Self {
            family: RwLock::new(family),
            unknown: RwLock::new(Vec::new()),
            rotate: AtomicUsize::new(0),
        }
    }

    pub fn seeded() -> Self {
        Self::new(vec![
            FamilyMember {
                name: "Sarah Johnson".to_string(),
                relation: "Daughter".to_string(),
                photo_url: Some("/images/family/sarah1.jpg".to_string()),
                training_images: vec![
                    "/images/family/sarah1.jpg".to_string(),
                    "/images/family/sarah2.jpg".to_string(),
                ],
            },
            FamilyMember {
                name: "Michael Johnson".to_string(),
                relation: "Son".to_string(),
                photo_url: Some("/images/family/michael1.jpg".to_string()),
                training_images: vec![
                    "/images/family/michael1.jpg".to_string(),
                    "/images/family/michael2.jpg".to_string(),
                ],
            },
            FamilyMember {
                name: "Emma Wilson".to_string(),
                relation: "Granddaughter".to_string(),
                photo_url: Some("/images/family/emma1.jpg".to_string()),
                training_images: vec!["/images/family/emma1.jpg".to_string()],
            },
        ])
    }

    pub async fn unknown_snapshot(&self) -> Vec<UnknownFace> {
        self.unknown.read().await.clone()
    }

    fn person(member: &FamilyMember) -> RecognizedPerson {
        RecognizedPerson {
            name: member.name.clone(),
            relation: member.relation.clone(),
            image_url: member
                .training_images
                .first()
                .cloned()
                .or_else(|| member.photo_url.clone()),
        }
    }
}

#[async_trait]
impl FaceMatcher for RosterMatcher {
    async fn identify(&self, image_data: &str) -> Option<RecognizedPerson> {
        let family = self.family.read().await;
        if family.is_empty() {
            return None;
        }
        if image_data.starts_with("data:") {
            let slot = hash_prefix(image_data) as usize % (family.len() + 1);
            return family.get(slot).map(Self::person);
        }
        if image_data.contains("/images/family/") {
            if let Some(member) = family.iter().find(|m| {
                m.training_images.iter().any(|p| image_data.contains(p))
                    || m.photo_url.as_ref().is_some_and(|p| image_data.contains(p))
            }) {
                return Some(Self::person(member));
            }
        }
        let index = self.rotate.fetch_add(1, Ordering::Relaxed) % family.len();
        family.get(index).map(Self::person)
    }

    async fn save_unknown(&self, image_data: &str) {
        self.unknown.write().await.insert(
            0,
            UnknownFace {
                id: Uuid::new_v4(),
                image_data: image_data.to_string(),
                captured_at: Utc::now(),
            },
        );
    }
}
