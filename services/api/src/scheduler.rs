//! Background due-reminder loop.
//!
//! Every tick, the current wall-clock time is rendered as the canonical
//! `"H:MM AM/PM"` label and compared against today's schedule. Matching
//! active entries are announced through the pipeline once per label per day;
//! the dedup set is cleared when the date rolls over, so daily reminders
//! announce again the next day and the set never outgrows one day's worth
//! of entries.

use crate::state::AppState;
use chrono::{Local, NaiveDate};
use memora_core::reminder::{ReminderStatus, ScheduleEntry};
use memora_core::store::ReminderStore;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

const TICK: Duration = Duration::from_secs(30);

/// Today's already-announced (reminder, label) pairs.
struct Announced {
    date: NaiveDate,
    seen: HashSet<(Uuid, String)>,
}

impl Announced {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            seen: HashSet::new(),
        }
    }

    /// Resets the set when `date` is a new day.
    fn roll(&mut self, date: NaiveDate) {
        if date != self.date {
            self.date = date;
            self.seen.clear();
        }
    }

    fn record(&mut self, id: Uuid, label: &str) {
        self.seen.insert((id, label.to_string()));
    }
}

pub fn spawn(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(run(state))
}

async fn run(state: Arc<AppState>) {
    let mut announced = Announced::new(Local::now().date_naive());
    let mut tick = tokio::time::interval(TICK);
    loop {
        tick.tick().await;
        let now = Local::now();
        announced.roll(now.date_naive());
        let label = now.format("%-I:%M %p").to_string();
        let schedule = match state.store.schedule_today().await {
            Ok(schedule) => schedule,
            Err(err) => {
                warn!(error = %err, "Failed to read today's schedule");
                continue;
            }
        };
        for id in due_entries(&schedule, &label, &announced.seen) {
            let Some(reminder) = state.store.get(id).await else {
                continue;
            };
            info!(title = %reminder.title, time = %reminder.time, "Announcing due reminder");
            state.pipeline.announce(&reminder).await;
            announced.record(id, &label);
        }
    }
}

/// Active entries due at `now_label` that have not been announced for it.
fn due_entries(
    schedule: &[ScheduleEntry],
    now_label: &str,
    announced: &HashSet<(Uuid, String)>,
) -> Vec<Uuid> {
    schedule
        .iter()
        .filter(|entry| {
            entry.status == ReminderStatus::Active
                && entry.time == now_label
                && !announced.contains(&(entry.id, now_label.to_string()))
        })
        .map(|entry| entry.id)
        .collect()
}
