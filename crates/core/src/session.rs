//! Dialogue session state and the confirmation escalation timer.
//!
//! A session owns at most one pending reminder (awaiting a frequency
//! follow-up) and at most one pending confirmation (awaiting spoken
//! completion). Announcing a reminder (re)starts a cancellable escalation
//! timer; when it fires and the tracked reminder still matches, the session
//! enters a strict yes/no phase and emits exactly one prompt.

use crate::Command;
use crate::reminder::{Frequency, Reminder};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::Arc;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default escalation delay after an announcement.
pub const ESCALATION_DELAY: Duration = Duration::from_secs(60);

/// A voice-created reminder awaiting its frequency follow-up.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingReminder {
    pub reminder_id: uuid::Uuid,
    pub created_at: DateTime<Utc>,
}

/// A just-announced reminder awaiting spoken completion.
#[derive(Debug)]
pub struct PendingConfirmation {
    pub reminder_id: uuid::Uuid,
    pub title: String,
    /// While true, only strict yes/no tokens are accepted.
    pub awaiting_yes_no: bool,
    pub created_at: DateTime<Utc>,
    escalation: Option<JoinHandle<()>>,
}

impl PendingConfirmation {
    /// Cancels the outstanding escalation timer, if any.
    pub fn cancel_escalation(&mut self) {
        if let Some(handle) = self.escalation.take() {
            handle.abort();
        }
    }
}

impl Drop for PendingConfirmation {
    fn drop(&mut self) {
        self.cancel_escalation();
    }
}

/// Derived dialogue state, for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueState {
    Idle,
    PendingFrequency,
    PendingConfirmOpen,
    PendingConfirmAwaitYesNo,
}

/// The per-session pending slots. At most one of each kind exists at a time.
#[derive(Debug, Default)]
pub struct SessionState {
    pub pending_reminder: Option<PendingReminder>,
    pub pending_confirmation: Option<PendingConfirmation>,
}

impl SessionState {
    pub fn dialogue_state(&self) -> DialogueState {
        match &self.pending_confirmation {
            Some(pending) if pending.awaiting_yes_no => DialogueState::PendingConfirmAwaitYesNo,
            Some(_) => DialogueState::PendingConfirmOpen,
            None if self.pending_reminder.is_some() => DialogueState::PendingFrequency,
            None => DialogueState::Idle,
        }
    }

    /// Takes the pending confirmation, cancelling its timer.
    pub fn resolve_confirmation(&mut self) -> Option<PendingConfirmation> {
        let mut pending = self.pending_confirmation.take()?;
        pending.cancel_escalation();
        Some(pending)
    }
}

/// Owns one client's dialogue state and its timers.
///
/// All state mutation goes through the inner mutex, so pipeline runs and
/// timer firings serialize on a single cooperative timeline.
pub struct SessionService {
    state: Arc<Mutex<SessionState>>,
    commands: Option<mpsc::Sender<Command>>,
    escalation_after: Duration,
}

impl SessionService {
    pub fn new(commands: Option<mpsc::Sender<Command>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::default())),
            commands,
            escalation_after: ESCALATION_DELAY,
        }
    }

    /// Overrides the escalation delay (tests use short or paused time).
    pub fn with_escalation_after(mut self, delay: Duration) -> Self {
        self.escalation_after = delay;
        self
    }

    /// The shared session state. The pipeline locks this once per transcript.
    pub fn state(&self) -> &Arc<Mutex<SessionState>> {
        &self.state
    }

    /// Records a voice-created reminder as pending its frequency follow-up.
    ///
    /// Single slot, last one wins: any earlier pending reminder is replaced
    /// and any pending confirmation (plus its timer) is superseded.
    pub async fn note_created(&self, reminder: &Reminder) {
        let mut state = self.state.lock().await;
        if let Some(mut old) = state.pending_confirmation.take() {
            debug!(superseded = %old.reminder_id, "Pending confirmation superseded by new reminder");
            old.cancel_escalation();
        }
        state.pending_reminder = Some(PendingReminder {
            reminder_id: reminder.id,
            created_at: Utc::now(),
        });
    }

    /// Announces a due reminder and opens its confirmation window.
    ///
    /// Speaks the announcement, installs the pending confirmation, and
    /// (re)starts the escalation timer, cancelling any prior one. When the
    /// timer fires it re-checks that this reminder is still the one tracked;
    /// a timer from a superseded reminder never acts.
    pub async fn announce(&self, reminder: &Reminder) {
        self.speak(format!("It's {}. {}.", reminder.time, reminder.title))
            .await;

        let mut state = self.state.lock().await;
        if let Some(mut old) = state.pending_confirmation.take() {
            old.cancel_escalation();
        }

        let escalation = tokio::spawn({
            let state = Arc::clone(&self.state);
            let commands = self.commands.clone();
            let delay = self.escalation_after;
            let reminder_id = reminder.id;
            let title = reminder.title.clone();
            async move {
                tokio::time::sleep(delay).await;
                let mut state = state.lock().await;
                let Some(pending) = state.pending_confirmation.as_mut() else {
                    return;
                };
                if pending.reminder_id != reminder_id {
                    debug!(%reminder_id, "Escalation timer fired for a superseded reminder; ignoring");
                    return;
                }
                pending.awaiting_yes_no = true;
                if let Some(tx) = commands {
                    let prompt = format!(
                        "Would you like me to mark {title} as complete? Please say yes or no."
                    );
                    if tx.send(Command::SpeakText(prompt)).await.is_err() {
                        warn!("Command receiver dropped; escalation prompt lost");
                    }
                }
            }
        });

        state.pending_confirmation = Some(PendingConfirmation {
            reminder_id: reminder.id,
            title: reminder.title.clone(),
            awaiting_yes_no: false,
            created_at: Utc::now(),
            escalation: Some(escalation),
        });
    }

    /// Sends a spoken line to the runtime, if a command channel is wired up.
    pub(crate) async fn speak(&self, text: String) {
        if let Some(tx) = &self.commands {
            if tx.send(Command::SpeakText(text)).await.is_err() {
                warn!("Command receiver dropped; spoken line lost");
            }
        }
    }
}

// --- Utterance matchers used by the pipeline's transition logic ---

static FREQUENCY_FOLLOW_UP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(daily|every day|weekly|once a week|one[- ]time|one time|once|only today|only for today)\b")
        .unwrap()
});
static BROAD_CONFIRM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(yes|yep|yeah|done|finished|completed|complete|mark(?: it| this)?|i (?:have )?(?:completed|finished|done)|i (?:just )?did it|ok(?:ay)?(?:,? mark it)?|sure|affirmative)\b",
    )
    .unwrap()
});
static STRICT_YES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(yes|yep|yeah|ok|okay)\b").unwrap());
static STRICT_NO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(no|nope|nah)\b").unwrap());

/// Parses a frequency follow-up word out of an utterance.
pub fn frequency_follow_up(text: &str) -> Option<Frequency> {
    let matched = FREQUENCY_FOLLOW_UP.captures(text)?[1].to_lowercase();
    if matched == "daily" || matched == "every day" {
        Some(Frequency::Daily)
    } else if matched == "weekly" || matched == "once a week" {
        Some(Frequency::Weekly)
    } else {
        Some(Frequency::OneTime)
    }
}

/// The broad confirmation accepted while a confirmation window is open.
pub fn is_broad_confirmation(text: &str) -> bool {
    BROAD_CONFIRM.is_match(text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YesNo {
    Yes,
    No,
}

/// The strict tokens accepted during the escalated yes/no phase. Anything
/// else returns `None` and must be ignored by the caller.
pub fn strict_yes_no(text: &str) -> Option<YesNo> {
    if STRICT_YES.is_match(text) {
        Some(YesNo::Yes)
    } else if STRICT_NO.is_match(text) {
        Some(YesNo::No)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::ReminderStatus;
    use tokio::time::{Duration, advance};

    fn reminder(title: &str) -> Reminder {
        Reminder {
            id: uuid::Uuid::new_v4(),
            title: title.to_string(),
            time: "9:00 AM".to_string(),
            frequency: Frequency::OneTime,
            status: ReminderStatus::Active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn frequency_words_map_to_frequencies() {
        assert_eq!(frequency_follow_up("daily please"), Some(Frequency::Daily));
        assert_eq!(frequency_follow_up("every day"), Some(Frequency::Daily));
        assert_eq!(frequency_follow_up("weekly"), Some(Frequency::Weekly));
        assert_eq!(frequency_follow_up("once a week"), Some(Frequency::Weekly));
        assert_eq!(frequency_follow_up("one-time"), Some(Frequency::OneTime));
        assert_eq!(frequency_follow_up("only today"), Some(Frequency::OneTime));
        assert_eq!(frequency_follow_up("tomorrow maybe"), None);
    }

    #[test]
    fn broad_and_strict_matchers() {
        assert!(is_broad_confirmation("okay mark it"));
        assert!(is_broad_confirmation("I just did it"));
        assert!(is_broad_confirmation("sure"));
        assert!(!is_broad_confirmation("maybe later"));

        assert_eq!(strict_yes_no("yes"), Some(YesNo::Yes));
        assert_eq!(strict_yes_no("nope"), Some(YesNo::No));
        assert_eq!(strict_yes_no("maybe"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn escalation_fires_exactly_once_and_prompts() {
        let (tx, mut rx) = mpsc::channel(8);
        let session = SessionService::new(Some(tx));
        let r = reminder("take pills");

        session.announce(&r).await;
        // Announcement line first.
        assert_eq!(
            rx.recv().await,
            Some(Command::SpeakText("It's 9:00 AM. take pills.".to_string()))
        );
        assert_eq!(
            session.state().lock().await.dialogue_state(),
            DialogueState::PendingConfirmOpen
        );

        advance(ESCALATION_DELAY + Duration::from_millis(10)).await;
        assert_eq!(
            rx.recv().await,
            Some(Command::SpeakText(
                "Would you like me to mark take pills as complete? Please say yes or no."
                    .to_string()
            ))
        );
        assert_eq!(
            session.state().lock().await.dialogue_state(),
            DialogueState::PendingConfirmAwaitYesNo
        );

        // No second prompt, no matter how long we wait.
        advance(ESCALATION_DELAY * 3).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn superseding_announcement_cancels_the_old_timer() {
        let (tx, mut rx) = mpsc::channel(8);
        let session = SessionService::new(Some(tx));
        let first = reminder("walk");
        let second = reminder("lunch");

        session.announce(&first).await;
        rx.recv().await;
        advance(Duration::from_secs(30)).await;
        session.announce(&second).await;
        rx.recv().await;

        advance(ESCALATION_DELAY + Duration::from_millis(10)).await;
        // Only the prompt for the second reminder arrives.
        assert_eq!(
            rx.recv().await,
            Some(Command::SpeakText(
                "Would you like me to mark lunch as complete? Please say yes or no.".to_string()
            ))
        );
        assert!(rx.try_recv().is_err());

        let state = session.state().lock().await;
        let pending = state.pending_confirmation.as_ref().unwrap();
        assert_eq!(pending.reminder_id, second.id);
    }

    #[tokio::test(start_paused = true)]
    async fn resolving_cancels_the_timer() {
        let (tx, mut rx) = mpsc::channel(8);
        let session = SessionService::new(Some(tx));
        let r = reminder("nap");

        session.announce(&r).await;
        rx.recv().await;
        session.state().lock().await.resolve_confirmation().unwrap();

        advance(ESCALATION_DELAY * 2).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(
            session.state().lock().await.dialogue_state(),
            DialogueState::Idle
        );
    }

    #[tokio::test(start_paused = true)]
    async fn new_creation_supersedes_a_pending_confirmation() {
        let (tx, mut rx) = mpsc::channel(8);
        let session = SessionService::new(Some(tx));
        let announced = reminder("walk");
        let created = reminder("tea");

        session.announce(&announced).await;
        rx.recv().await;
        session.note_created(&created).await;

        {
            let state = session.state().lock().await;
            assert_eq!(state.dialogue_state(), DialogueState::PendingFrequency);
            assert_eq!(
                state.pending_reminder.as_ref().unwrap().reminder_id,
                created.id
            );
            assert!(state.pending_confirmation.is_none());
        }

        advance(ESCALATION_DELAY * 2).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn consecutive_creations_keep_only_the_latest() {
        let session = SessionService::new(None);
        let first = reminder("walk");
        let second = reminder("tea");

        session.note_created(&first).await;
        session.note_created(&second).await;

        let state = session.state().lock().await;
        assert_eq!(
            state.pending_reminder.as_ref().unwrap().reminder_id,
            second.id
        );
    }
}
