//! Rule-based intent classification.
//!
//! An ordered list of (pattern, intent) pairs; the first matching rule wins,
//! so precedence is explicit and each rule is independently testable.
//! Unmatched input always falls through to [`Intent::SmallTalk`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Coarse action category inferred from a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    SetReminder,
    CompleteReminder,
    WhoIsThis,
    FamilyAlert,
    EmergencyAlert,
    OpenPhotos,
    PlayBrainGame,
    OpenUpcoming,
    SmallTalk,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Intent::SetReminder => "set_reminder",
            Intent::CompleteReminder => "complete_reminder",
            Intent::WhoIsThis => "who_is_this",
            Intent::FamilyAlert => "family_alert",
            Intent::EmergencyAlert => "emergency_alert",
            Intent::OpenPhotos => "open_photos",
            Intent::PlayBrainGame => "play_brain_game",
            Intent::OpenUpcoming => "open_upcoming",
            Intent::SmallTalk => "small_talk",
        };
        write!(f, "{label}")
    }
}

/// The precedence-ordered rule table.
///
/// Rule 1 matches reminder-*setting* phrasing only: `\bremind\b` does not hit
/// the noun in "mark the grocery reminder as done", which must fall through
/// to the completion rule.
static RULES: LazyLock<Vec<(Regex, Intent)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"\bremind\b|\bremember\b|\bset\b.*\breminder\b|\badd\b.*\breminder\b")
                .unwrap(),
            Intent::SetReminder,
        ),
        (
            Regex::new(r"who is this|who is that|who am i with|who are you").unwrap(),
            Intent::WhoIsThis,
        ),
        (
            Regex::new(r"\b(alert (?:my )?family|email my family|tell my family)\b").unwrap(),
            Intent::FamilyAlert,
        ),
        (
            Regex::new(
                r"\b(mark .* (done|complete)|mark (?:it|this) (done|complete)|i (finished|completed)|yes,? mark it)\b",
            )
            .unwrap(),
            Intent::CompleteReminder,
        ),
        (
            Regex::new(r"\b(i need help|help me|alert (?:my )?caregiver|emergency|sos)\b").unwrap(),
            Intent::EmergencyAlert,
        ),
        (
            Regex::new(r"open photos|show photos|view photos|photos").unwrap(),
            Intent::OpenPhotos,
        ),
        (
            Regex::new(r"play brain game|start brain game|brain game|play game").unwrap(),
            Intent::PlayBrainGame,
        ),
        (
            Regex::new(r"open upcoming|show schedule|open schedule|upcoming").unwrap(),
            Intent::OpenUpcoming,
        ),
    ]
});

/// Classifies a transcript into exactly one [`Intent`]. Never fails.
pub fn classify(text: &str) -> Intent {
    let lower = text.to_lowercase();
    for (rx, intent) in RULES.iter() {
        if rx.is_match(&lower) {
            return *intent;
        }
    }
    Intent::SmallTalk
}
