//! The reminder-store collaborator contract.
//!
//! The core awaits each call synchronously from its own perspective and never
//! retries; a failed write surfaces at the orchestrator boundary without
//! clearing pending dialogue state.

use crate::reminder::{NewReminder, Reminder, ReminderPatch, ReminderStatus, ScheduleEntry};
use async_trait::async_trait;
use uuid::Uuid;

/// Errors a store implementation may surface. Not-found is not an error; the
/// lookup operations express it with `Option`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("reminder store unavailable: {0}")]
    Unavailable(String),
}

/// Identifies the reminder a completion request targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionTarget {
    Id(Uuid),
    /// Matched against titles case-insensitively, skipping already-completed
    /// reminders.
    Title(String),
}

/// Contract for the external reminder store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// Creates a reminder, assigning its id and timestamps.
    async fn create(&self, reminder: NewReminder) -> Result<Reminder, StoreError>;

    /// Applies a partial update. `None` if the reminder does not exist.
    async fn update(&self, id: Uuid, patch: ReminderPatch) -> Result<Option<Reminder>, StoreError>;

    /// Marks the targeted reminder completed and re-syncs the schedule view.
    /// `None` if no matching reminder exists.
    async fn complete(&self, target: CompletionTarget) -> Result<Option<Reminder>, StoreError>;

    /// Lists reminders with the given status.
    async fn list(&self, status: ReminderStatus) -> Result<Vec<Reminder>, StoreError>;

    /// The derived today-schedule view; the core does not own its ordering.
    async fn schedule_today(&self) -> Result<Vec<ScheduleEntry>, StoreError>;
}
