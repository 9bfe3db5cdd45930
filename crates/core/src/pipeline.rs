//! The voice pipeline: one transcript in, one structured reply out.
//!
//! A run is classify + extract + affect, then a single dispatch against the
//! session's pending slots and the inferred intent. Side effects go through
//! the collaborator traits; the pipeline itself never touches storage or
//! transport directly.

use crate::affect::{self, AffectResult, Emotion};
use crate::entities::{self, Entities};
use crate::faces::{CapturedFace, FaceMatcher, RecognizedPerson};
use crate::intent::{self, Intent};
use crate::notify::{ActivityEvent, ActivityKind, ActivityLog, AlertRequest, Email, Notifier, Severity};
use crate::reminder::{Frequency, NewReminder, Reminder, ReminderPatch};
use crate::session::{self, SessionService, YesNo};
use crate::store::{CompletionTarget, ReminderStore, StoreError};
use chrono::Local;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Where alert and family emails go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contacts {
    pub caregiver_email: String,
    pub family_email: String,
}

/// One transcript plus whatever acoustic and camera context the client has.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineRequest {
    pub transcript: String,
    /// Externally estimated voice emotion, when the client ran one.
    #[serde(default)]
    pub voice_emotion: Option<Emotion>,
    #[serde(default)]
    pub voice_confidence: f64,
    #[serde(default)]
    pub faces: Vec<CapturedFace>,
}

/// UI hint accompanying a spoken response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiAction {
    AskRepeat,
    RefreshSchedule,
    OpenPhotos,
    PlayBrainGame,
    OpenUpcoming,
    ShowIdentity,
    ShowIdentities,
}

/// The structured outcome of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReply {
    pub transcript: String,
    pub emotion: Emotion,
    pub emotion_confidence: f64,
    pub intent: Intent,
    pub entities: Entities,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui_action: Option<UiAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<Reminder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recognized: Option<RecognizedPerson>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recognized_list: Vec<RecognizedPerson>,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

static AM_DEFAULT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(am|a\.m\.|in the morning|morning)\b").unwrap());
static PM_DEFAULT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(pm|p\.m\.|in the evening|night|tonight|sleep)\b").unwrap());
static DISTRESS_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)scared|panic|worried").unwrap());
static TIME_QUERY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)time").unwrap());

/// Orchestrates one client's dialogue turns.
pub struct Pipeline {
    store: Arc<dyn ReminderStore>,
    notifier: Arc<dyn Notifier>,
    activity: Arc<dyn ActivityLog>,
    faces: Arc<dyn FaceMatcher>,
    session: SessionService,
    contacts: Contacts,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        notifier: Arc<dyn Notifier>,
        activity: Arc<dyn ActivityLog>,
        faces: Arc<dyn FaceMatcher>,
        session: SessionService,
        contacts: Contacts,
    ) -> Self {
        Self {
            store,
            notifier,
            activity,
            faces,
            session,
            contacts,
        }
    }

    pub fn session(&self) -> &SessionService {
        &self.session
    }

    /// Announces a due reminder and opens its confirmation window.
    pub async fn announce(&self, reminder: &Reminder) {
        self.session.announce(reminder).await;
    }

    /// Runs one transcript through the full pipeline.
    ///
    /// Only store failures are errors; notification and activity-log failures
    /// are logged and never fail the turn. A store failure leaves the pending
    /// slots exactly as they were.
    pub async fn run(&self, request: PipelineRequest) -> Result<PipelineReply, PipelineError> {
        let transcript = request.transcript.trim().to_string();
        let affect =
            affect::estimate(&transcript).fuse(request.voice_emotion, request.voice_confidence);
        let intent = intent::classify(&transcript);
        let entities = entities::extract(&transcript);

        let mut reply = PipelineReply {
            transcript: transcript.clone(),
            emotion: affect.emotion,
            emotion_confidence: affect.confidence,
            intent,
            entities: entities.clone(),
            response: String::new(),
            ui_action: None,
            created: None,
            recognized: None,
            recognized_list: Vec::new(),
        };

        if transcript.is_empty() {
            return Ok(reply);
        }
        debug!(intent = %intent, emotion = %affect.emotion, "Classified transcript");

        if let Some(handled) = self.dispatch_pending(&transcript, &mut reply).await? {
            return Ok(handled);
        }

        match intent {
            Intent::SetReminder => {
                let title = entities.task.clone().unwrap_or_else(|| "Reminder".to_string());
                let time = entities.time.clone().unwrap_or_else(|| {
                    if AM_DEFAULT.is_match(&transcript) {
                        "10:00 AM".to_string()
                    } else if PM_DEFAULT.is_match(&transcript) {
                        "10:00 PM".to_string()
                    } else {
                        "6:00 PM".to_string()
                    }
                });
                let created = self
                    .store
                    .create(NewReminder {
                        title,
                        time,
                        frequency: Frequency::OneTime,
                    })
                    .await?;
                self.session.note_created(&created).await;
                reply.response = format!(
                    "Okay. I set a reminder \"{}\" at {}.",
                    created.title, created.time
                );
                reply.ui_action = Some(UiAction::AskRepeat);
                reply.created = Some(created);
            }
            Intent::CompleteReminder => {
                let Some(title) = entities.task.clone() else {
                    reply.response = "Which reminder should I mark complete?".to_string();
                    return Ok(reply);
                };
                match self
                    .store
                    .complete(CompletionTarget::Title(title.clone()))
                    .await?
                {
                    Some(done) => {
                        let mut state = self.session.state().lock().await;
                        if state
                            .pending_confirmation
                            .as_ref()
                            .is_some_and(|p| p.reminder_id == done.id)
                        {
                            state.resolve_confirmation();
                        }
                        reply.response = format!("Marked \"{}\" as complete.", done.title);
                        reply.ui_action = Some(UiAction::RefreshSchedule);
                    }
                    None => {
                        let at = entities
                            .time
                            .as_ref()
                            .map(|t| format!(" at {t}"))
                            .unwrap_or_default();
                        reply.response = format!("I couldn't find \"{title}\"{at}.");
                    }
                }
            }
            Intent::WhoIsThis => self.identify_faces(&request.faces, &mut reply).await,
            Intent::FamilyAlert => {
                self.send_email(Email {
                    to: self.contacts.family_email.clone(),
                    subject: "Family Alert".to_string(),
                    body: "The patient requested to alert the family.".to_string(),
                })
                .await;
                reply.response = "I have emailed your family.".to_string();
            }
            Intent::EmergencyAlert => {
                self.send_alert(AlertRequest {
                    title: "Emergency Phrase Detected".to_string(),
                    severity: Severity::High,
                    description: "User requested immediate help".to_string(),
                })
                .await;
                self.send_email(Email {
                    to: self.contacts.caregiver_email.clone(),
                    subject: "Emergency Alert".to_string(),
                    body: "Emergency phrase detected by system.".to_string(),
                })
                .await;
                reply.response =
                    "I have notified your caregiver and initiated emergency protocol.".to_string();
            }
            Intent::OpenPhotos => {
                reply.response = "Opening photos.".to_string();
                reply.ui_action = Some(UiAction::OpenPhotos);
            }
            Intent::PlayBrainGame => {
                reply.response = "Starting brain game.".to_string();
                reply.ui_action = Some(UiAction::PlayBrainGame);
            }
            Intent::OpenUpcoming => {
                reply.response = "Showing your upcoming schedule.".to_string();
                reply.ui_action = Some(UiAction::OpenUpcoming);
            }
            Intent::SmallTalk => {
                self.small_talk(&transcript, &request, affect, &mut reply)
                    .await;
            }
        }

        Ok(reply)
    }

    /// Consumes the transcript against the pending slots, in priority order:
    /// strict yes/no when escalated, then frequency follow-up, then broad
    /// confirmation. Returns `None` when nothing pending claimed the turn.
    async fn dispatch_pending(
        &self,
        transcript: &str,
        reply: &mut PipelineReply,
    ) -> Result<Option<PipelineReply>, PipelineError> {
        let mut state = self.session.state().lock().await;

        let awaiting = state
            .pending_confirmation
            .as_ref()
            .filter(|p| p.awaiting_yes_no)
            .map(|p| (p.reminder_id, p.title.clone()));
        if let Some((id, title)) = awaiting {
            match session::strict_yes_no(transcript) {
                Some(YesNo::Yes) => {
                    let completed = self.store.complete(CompletionTarget::Id(id)).await?;
                    state.resolve_confirmation();
                    match completed {
                        Some(done) => {
                            reply.response = format!("Marked \"{}\" as complete.", done.title);
                            reply.ui_action = Some(UiAction::RefreshSchedule);
                        }
                        None => reply.response = format!("I couldn't find \"{title}\"."),
                    }
                    return Ok(Some(reply.clone()));
                }
                Some(YesNo::No) => {
                    state.resolve_confirmation();
                    reply.response = "Okay, I won't mark it complete.".to_string();
                    return Ok(Some(reply.clone()));
                }
                // Anything else falls through to normal handling, slot intact.
                None => return Ok(None),
            }
        }

        if let Some(freq) = session::frequency_follow_up(transcript) {
            if let Some(pending) = state.pending_reminder.clone() {
                let patch = ReminderPatch {
                    frequency: Some(freq),
                    ..ReminderPatch::default()
                };
                if self.store.update(pending.reminder_id, patch).await?.is_some() {
                    state.pending_reminder = None;
                    reply.response =
                        format!("Okay — I'll repeat that {}.", freq.to_string().to_lowercase());
                    reply.ui_action = Some(UiAction::RefreshSchedule);
                    return Ok(Some(reply.clone()));
                }
                // The reminder vanished underneath us; normal handling takes over.
            }
        }

        let open = state
            .pending_confirmation
            .as_ref()
            .map(|p| (p.reminder_id, p.title.clone()));
        if let Some((id, title)) = open {
            if session::is_broad_confirmation(transcript) {
                match self.store.complete(CompletionTarget::Id(id)).await? {
                    Some(done) => {
                        state.resolve_confirmation();
                        reply.response = format!("Marked \"{}\" as complete.", done.title);
                        reply.ui_action = Some(UiAction::RefreshSchedule);
                    }
                    // Keep the window open so a later retry can still land.
                    None => reply.response = format!("I couldn't find \"{title}\"."),
                }
                return Ok(Some(reply.clone()));
            }
        }

        Ok(None)
    }

    async fn identify_faces(&self, faces: &[CapturedFace], reply: &mut PipelineReply) {
        if faces.len() > 1 {
            let mut ordered: Vec<&CapturedFace> = faces.iter().collect();
            ordered.sort_by(|a, b| a.x.total_cmp(&b.x));
            let mut parts = Vec::new();
            for face in ordered {
                match self.faces.identify(&face.image_data).await {
                    Some(person) => {
                        parts.push(format!("{}, your {}", person.name, person.relation));
                        self.log_activity(ActivityEvent::new(
                            "👤",
                            "Relationship cueing",
                            format!("Recognized {}", person.name),
                            ActivityKind::FaceRecognition,
                        ))
                        .await;
                        reply.recognized_list.push(person);
                    }
                    None => {
                        parts.push("Sorry I do not know this person".to_string());
                        self.faces.save_unknown(&face.image_data).await;
                        self.log_activity(ActivityEvent::new(
                            "❓",
                            "Unknown person",
                            "Saved screenshot for caregiver review",
                            ActivityKind::FaceRecognition,
                        ))
                        .await;
                    }
                }
            }
            reply.response = format!("Starting from the left this is {}.", parts.join(", "));
            reply.ui_action = Some(UiAction::ShowIdentities);
            return;
        }

        let Some(face) = faces.first() else {
            reply.response = "Sorry I do not know this person".to_string();
            return;
        };
        match self.faces.identify(&face.image_data).await {
            Some(person) => {
                reply.response = format!("This is {}, your {}.", person.name, person.relation);
                reply.ui_action = Some(UiAction::ShowIdentity);
                self.log_activity(ActivityEvent::new(
                    "👤",
                    "Relationship cueing",
                    reply.response.clone(),
                    ActivityKind::FaceRecognition,
                ))
                .await;
                reply.recognized = Some(person);
            }
            None => {
                reply.response = "Sorry I do not know this person".to_string();
                self.faces.save_unknown(&face.image_data).await;
                self.log_activity(ActivityEvent::new(
                    "❓",
                    "Unknown person",
                    "Saved screenshot for caregiver review",
                    ActivityKind::FaceRecognition,
                ))
                .await;
            }
        }
    }

    /// The small-talk arm, including the emotionally aware responses. The
    /// supportive and escalating branches only trigger when an external voice
    /// emotion arrived with high fused confidence.
    async fn small_talk(
        &self,
        transcript: &str,
        request: &PipelineRequest,
        affect: AffectResult,
        reply: &mut PipelineReply,
    ) {
        let reliable = request.voice_emotion.is_some() && affect.confidence >= 0.75;
        if reliable && affect.emotion == Emotion::Angry {
            self.send_alert(AlertRequest {
                title: "Anger/Frustration detected".to_string(),
                severity: Severity::High,
                description: format!("Voice emotion analyzer detected anger: {transcript}"),
            })
            .await;
            self.send_email(Email {
                to: self.contacts.caregiver_email.clone(),
                subject: "Caregiver Alert: Agitation detected".to_string(),
                body: format!(
                    "The system detected signs of anger/frustration in the user's voice: {transcript}"
                ),
            })
            .await;
            reply.response =
                "I detected you sounded upset. I've notified your caregiver so they can check in."
                    .to_string();
        } else if reliable
            && (affect.emotion == Emotion::Stressed || DISTRESS_WORDS.is_match(transcript))
        {
            reply.response =
                "I'm here with you right now. Let's take a deep breath together.".to_string();
        } else if reliable && affect.emotion == Emotion::Sad {
            reply.response =
                "I'm here with you right now. Would you like to call your family?".to_string();
        } else if TIME_QUERY.is_match(transcript) {
            let now = Local::now();
            reply.response = format!(
                "It's currently {} on {}.",
                now.format("%I:%M %p"),
                now.format("%-m/%-d/%Y")
            );
        } else {
            reply.response = "How can I help?".to_string();
        }
    }

    async fn send_alert(&self, alert: AlertRequest) {
        if let Err(err) = self.notifier.send_alert(alert).await {
            warn!(error = %err, "Failed to send alert");
        }
    }

    async fn send_email(&self, email: Email) {
        if let Err(err) = self.notifier.send_email(email).await {
            warn!(error = %err, "Failed to send email");
        }
    }

    async fn log_activity(&self, event: ActivityEvent) {
        if let Err(err) = self.activity.append(event).await {
            warn!(error = %err, "Failed to record activity event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faces::MockFaceMatcher;
    use crate::notify::{MockActivityLog, MockNotifier};
    use crate::reminder::ReminderStatus;
    use crate::session::{DialogueState, ESCALATION_DELAY};
    use crate::store::MockReminderStore;
    use chrono::Utc;
    use mockall::predicate::eq;
    use tokio::time::advance;
    use uuid::Uuid;

    fn contacts() -> Contacts {
        Contacts {
            caregiver_email: "caregiver@example.com".to_string(),
            family_email: "family@example.com".to_string(),
        }
    }

    fn reminder(id: Uuid, title: &str, time: &str) -> Reminder {
        Reminder {
            id,
            title: title.to_string(),
            time: time.to_string(),
            frequency: Frequency::OneTime,
            status: ReminderStatus::Active,
            created_at: Utc::now(),
        }
    }

    fn quiet_notifier() -> MockNotifier {
        let mut notifier = MockNotifier::new();
        notifier.expect_send_alert().never();
        notifier.expect_send_email().never();
        notifier
    }

    fn quiet_activity() -> MockActivityLog {
        let mut activity = MockActivityLog::new();
        activity.expect_append().returning(|_| Ok(()));
        activity
    }

    fn pipeline(store: MockReminderStore) -> Pipeline {
        pipeline_with(store, quiet_notifier(), MockFaceMatcher::new())
    }

    fn pipeline_with(
        store: MockReminderStore,
        notifier: MockNotifier,
        faces: MockFaceMatcher,
    ) -> Pipeline {
        Pipeline::new(
            Arc::new(store),
            Arc::new(notifier),
            Arc::new(quiet_activity()),
            Arc::new(faces),
            SessionService::new(None),
            contacts(),
        )
    }

    fn request(transcript: &str) -> PipelineRequest {
        PipelineRequest {
            transcript: transcript.to_string(),
            ..PipelineRequest::default()
        }
    }

    #[tokio::test]
    async fn empty_transcript_yields_empty_response() {
        let mut store = MockReminderStore::new();
        store.expect_create().never();
        let pipeline = pipeline(store);

        let reply = pipeline.run(request("   ")).await.unwrap();
        assert_eq!(reply.response, "");
        assert_eq!(reply.intent, Intent::SmallTalk);
        assert!(reply.ui_action.is_none());
    }

    #[tokio::test]
    async fn set_reminder_creates_and_opens_frequency_window() {
        let id = Uuid::new_v4();
        let mut store = MockReminderStore::new();
        store
            .expect_create()
            .withf(|new| new.title == "take pills" && new.time == "10:52 PM")
            .returning(move |new| Ok(reminder(id, &new.title, &new.time)));
        let pipeline = pipeline(store);

        let reply = pipeline
            .run(request("set reminder take pills at 10:52 pm"))
            .await
            .unwrap();
        assert_eq!(reply.intent, Intent::SetReminder);
        assert_eq!(
            reply.response,
            "Okay. I set a reminder \"take pills\" at 10:52 PM."
        );
        assert_eq!(reply.ui_action, Some(UiAction::AskRepeat));
        assert_eq!(reply.created.as_ref().map(|r| r.id), Some(id));
        assert_eq!(
            pipeline.session().state().lock().await.dialogue_state(),
            DialogueState::PendingFrequency
        );
    }

    #[tokio::test]
    async fn set_reminder_without_time_defaults_by_meridiem_words() {
        let mut store = MockReminderStore::new();
        store
            .expect_create()
            .withf(|new| new.title == "Reminder" && new.time == "6:00 PM")
            .returning(|new| Ok(reminder(Uuid::new_v4(), &new.title, &new.time)));
        let pipeline = pipeline(store);

        let reply = pipeline.run(request("set a reminder")).await.unwrap();
        assert_eq!(reply.response, "Okay. I set a reminder \"Reminder\" at 6:00 PM.");
    }

    #[tokio::test]
    async fn frequency_follow_up_patches_and_clears_the_window() {
        let id = Uuid::new_v4();
        let mut store = MockReminderStore::new();
        store
            .expect_create()
            .returning(move |new| Ok(reminder(id, &new.title, &new.time)));
        store
            .expect_update()
            .withf(move |got, patch| *got == id && patch.frequency == Some(Frequency::Daily))
            .returning(move |got, _| Ok(Some(reminder(got, "take pills", "9:00 AM"))));
        let pipeline = pipeline(store);

        pipeline
            .run(request("remind me to take pills at 9 am"))
            .await
            .unwrap();
        let reply = pipeline.run(request("daily")).await.unwrap();
        assert_eq!(reply.response, "Okay — I'll repeat that daily.");
        assert_eq!(reply.ui_action, Some(UiAction::RefreshSchedule));
        assert_eq!(
            pipeline.session().state().lock().await.dialogue_state(),
            DialogueState::Idle
        );
    }

    #[tokio::test]
    async fn broad_confirmation_completes_an_announced_reminder() {
        let id = Uuid::new_v4();
        let mut store = MockReminderStore::new();
        store
            .expect_complete()
            .with(eq(CompletionTarget::Id(id)))
            .returning(move |_| Ok(Some(reminder(id, "take pills", "9:00 AM"))));
        let pipeline = pipeline(store);

        pipeline.announce(&reminder(id, "take pills", "9:00 AM")).await;
        let reply = pipeline.run(request("okay mark it")).await.unwrap();
        assert_eq!(reply.response, "Marked \"take pills\" as complete.");
        assert_eq!(reply.ui_action, Some(UiAction::RefreshSchedule));
        assert_eq!(
            pipeline.session().state().lock().await.dialogue_state(),
            DialogueState::Idle
        );
    }

    #[tokio::test]
    async fn broad_confirmation_not_found_keeps_the_window_open() {
        let id = Uuid::new_v4();
        let mut store = MockReminderStore::new();
        store.expect_complete().returning(|_| Ok(None));
        let pipeline = pipeline(store);

        pipeline.announce(&reminder(id, "take pills", "9:00 AM")).await;
        let reply = pipeline.run(request("done")).await.unwrap();
        assert_eq!(reply.response, "I couldn't find \"take pills\".");
        assert_eq!(
            pipeline.session().state().lock().await.dialogue_state(),
            DialogueState::PendingConfirmOpen
        );
    }

    #[tokio::test]
    async fn store_failure_propagates_and_leaves_the_window_open() {
        let id = Uuid::new_v4();
        let mut store = MockReminderStore::new();
        store
            .expect_complete()
            .returning(|_| Err(StoreError::Unavailable("down".to_string())));
        let pipeline = pipeline(store);

        pipeline.announce(&reminder(id, "take pills", "9:00 AM")).await;
        let err = pipeline.run(request("done")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Store(_)));
        assert_eq!(
            pipeline.session().state().lock().await.dialogue_state(),
            DialogueState::PendingConfirmOpen
        );
    }

    #[tokio::test(start_paused = true)]
    async fn escalated_window_accepts_only_strict_tokens() {
        let id = Uuid::new_v4();
        let mut store = MockReminderStore::new();
        store
            .expect_complete()
            .with(eq(CompletionTarget::Id(id)))
            .returning(move |_| Ok(Some(reminder(id, "take pills", "9:00 AM"))));
        let pipeline = pipeline(store);

        pipeline.announce(&reminder(id, "take pills", "9:00 AM")).await;
        // Let the escalation task register its sleep before moving the clock.
        tokio::task::yield_now().await;
        advance(ESCALATION_DELAY + std::time::Duration::from_millis(10)).await;
        tokio::task::yield_now().await;
        assert_eq!(
            pipeline.session().state().lock().await.dialogue_state(),
            DialogueState::PendingConfirmAwaitYesNo
        );

        // An ambiguous reply neither completes nor clears.
        let reply = pipeline.run(request("maybe")).await.unwrap();
        assert_eq!(reply.response, "How can I help?");
        assert_eq!(
            pipeline.session().state().lock().await.dialogue_state(),
            DialogueState::PendingConfirmAwaitYesNo
        );

        let reply = pipeline.run(request("yes")).await.unwrap();
        assert_eq!(reply.response, "Marked \"take pills\" as complete.");
        assert_eq!(
            pipeline.session().state().lock().await.dialogue_state(),
            DialogueState::Idle
        );
    }

    #[tokio::test(start_paused = true)]
    async fn escalated_window_declined_with_no() {
        let id = Uuid::new_v4();
        let mut store = MockReminderStore::new();
        store.expect_complete().never();
        let pipeline = pipeline(store);

        pipeline.announce(&reminder(id, "take pills", "9:00 AM")).await;
        tokio::task::yield_now().await;
        advance(ESCALATION_DELAY + std::time::Duration::from_millis(10)).await;
        tokio::task::yield_now().await;

        let reply = pipeline.run(request("no")).await.unwrap();
        assert_eq!(reply.response, "Okay, I won't mark it complete.");
        assert_eq!(
            pipeline.session().state().lock().await.dialogue_state(),
            DialogueState::Idle
        );
    }

    #[tokio::test(start_paused = true)]
    async fn new_creation_supersedes_an_open_confirmation() {
        let announced = Uuid::new_v4();
        let mut store = MockReminderStore::new();
        store
            .expect_create()
            .returning(|new| Ok(reminder(Uuid::new_v4(), &new.title, &new.time)));
        store.expect_complete().never();
        let pipeline = pipeline(store);

        pipeline.announce(&reminder(announced, "walk", "2:00 PM")).await;
        pipeline
            .run(request("remind me to drink tea at 4 pm"))
            .await
            .unwrap();
        assert_eq!(
            pipeline.session().state().lock().await.dialogue_state(),
            DialogueState::PendingFrequency
        );

        // The superseded reminder's timer never escalates.
        advance(ESCALATION_DELAY * 2).await;
        assert_eq!(
            pipeline.session().state().lock().await.dialogue_state(),
            DialogueState::PendingFrequency
        );
    }

    #[tokio::test]
    async fn complete_by_title_reports_missing_reminders() {
        let mut store = MockReminderStore::new();
        store
            .expect_complete()
            .with(eq(CompletionTarget::Title("Grocery reminder".to_string())))
            .returning(|_| Ok(None));
        let pipeline = pipeline(store);

        let reply = pipeline
            .run(request("mark the Grocery reminder as done"))
            .await
            .unwrap();
        assert_eq!(reply.intent, Intent::CompleteReminder);
        assert_eq!(reply.response, "I couldn't find \"Grocery reminder\".");
    }

    #[tokio::test]
    async fn complete_without_a_title_asks_which_one() {
        let mut store = MockReminderStore::new();
        store.expect_complete().never();
        let pipeline = pipeline(store);

        let reply = pipeline.run(request("yes, mark it done")).await.unwrap();
        assert_eq!(reply.response, "Which reminder should I mark complete?");
    }

    #[tokio::test]
    async fn emergency_alerts_caregiver_by_alert_and_email() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send_alert()
            .withf(|a| a.title == "Emergency Phrase Detected" && a.severity == Severity::High)
            .times(1)
            .returning(|_| Ok(()));
        notifier
            .expect_send_email()
            .withf(|e| e.to == "caregiver@example.com" && e.subject == "Emergency Alert")
            .times(1)
            .returning(|_| Ok(()));
        let pipeline = pipeline_with(MockReminderStore::new(), notifier, MockFaceMatcher::new());

        let reply = pipeline.run(request("I need help")).await.unwrap();
        assert_eq!(
            reply.response,
            "I have notified your caregiver and initiated emergency protocol."
        );
    }

    #[tokio::test]
    async fn family_alert_emails_the_family() {
        let mut notifier = MockNotifier::new();
        notifier.expect_send_alert().never();
        notifier
            .expect_send_email()
            .withf(|e| e.to == "family@example.com" && e.subject == "Family Alert")
            .times(1)
            .returning(|_| Ok(()));
        let pipeline = pipeline_with(MockReminderStore::new(), notifier, MockFaceMatcher::new());

        let reply = pipeline.run(request("alert my family")).await.unwrap();
        assert_eq!(reply.response, "I have emailed your family.");
    }

    #[tokio::test]
    async fn confident_external_anger_escalates_to_the_caregiver() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send_alert()
            .withf(|a| a.title == "Anger/Frustration detected")
            .times(1)
            .returning(|_| Ok(()));
        notifier
            .expect_send_email()
            .withf(|e| e.subject == "Caregiver Alert: Agitation detected")
            .times(1)
            .returning(|_| Ok(()));
        let pipeline = pipeline_with(MockReminderStore::new(), notifier, MockFaceMatcher::new());

        let reply = pipeline
            .run(PipelineRequest {
                transcript: "this is ridiculous".to_string(),
                voice_emotion: Some(Emotion::Angry),
                voice_confidence: 0.9,
                faces: Vec::new(),
            })
            .await
            .unwrap();
        assert_eq!(
            reply.response,
            "I detected you sounded upset. I've notified your caregiver so they can check in."
        );
    }

    #[tokio::test]
    async fn text_only_anger_does_not_escalate() {
        let pipeline = pipeline(MockReminderStore::new());

        let reply = pipeline
            .run(request("I am so angry about this!"))
            .await
            .unwrap();
        assert_eq!(reply.emotion, Emotion::Angry);
        assert_eq!(reply.response, "How can I help?");
    }

    #[tokio::test]
    async fn who_is_this_names_a_known_person() {
        let mut faces = MockFaceMatcher::new();
        faces.expect_identify().returning(|_| {
            Some(RecognizedPerson {
                name: "Mary".to_string(),
                relation: "daughter".to_string(),
                image_url: None,
            })
        });
        faces.expect_save_unknown().never();
        let pipeline = pipeline_with(MockReminderStore::new(), quiet_notifier(), faces);

        let reply = pipeline
            .run(PipelineRequest {
                transcript: "who is this".to_string(),
                faces: vec![CapturedFace {
                    x: 0.0,
                    image_data: "img".to_string(),
                }],
                ..PipelineRequest::default()
            })
            .await
            .unwrap();
        assert_eq!(reply.response, "This is Mary, your daughter.");
        assert_eq!(reply.ui_action, Some(UiAction::ShowIdentity));
        assert_eq!(reply.recognized.as_ref().map(|p| p.name.as_str()), Some("Mary"));
    }

    #[tokio::test]
    async fn who_is_this_orders_multiple_faces_left_to_right() {
        let mut faces = MockFaceMatcher::new();
        faces.expect_identify().with(eq("left")).returning(|_| {
            Some(RecognizedPerson {
                name: "Mary".to_string(),
                relation: "daughter".to_string(),
                image_url: None,
            })
        });
        faces.expect_identify().with(eq("right")).returning(|_| None);
        faces.expect_save_unknown().with(eq("right")).times(1).return_const(());
        let pipeline = pipeline_with(MockReminderStore::new(), quiet_notifier(), faces);

        let reply = pipeline
            .run(PipelineRequest {
                transcript: "who is this".to_string(),
                faces: vec![
                    CapturedFace {
                        x: 0.8,
                        image_data: "right".to_string(),
                    },
                    CapturedFace {
                        x: 0.1,
                        image_data: "left".to_string(),
                    },
                ],
                ..PipelineRequest::default()
            })
            .await
            .unwrap();
        assert_eq!(
            reply.response,
            "Starting from the left this is Mary, your daughter, Sorry I do not know this person."
        );
        assert_eq!(reply.ui_action, Some(UiAction::ShowIdentities));
        assert_eq!(reply.recognized_list.len(), 1);
    }
}
