//! Slot extraction from free-text transcripts.
//!
//! Pulls an optional time and an optional task title out of an utterance.
//! Both searches are independent ordered regex cascades; absence of a slot is
//! a valid outcome, not an error.

use crate::time;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Structured slots extracted from a transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entities {
    /// Canonical `"H:MM AM/PM"` time, when one was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Task title, when one was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
}

static DOT_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d)\.(\d)").unwrap());

/// Time patterns, most specific first: colon+meridiem, bare-hour+meridiem,
/// keyword, bare 24-hour clock.
static TIME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)\b(\d{1,2}:\d{2}\s*(?:am|pm))\b").unwrap(),
        Regex::new(r"(?i)\b(\d{1,2}\s*(?:am|pm))\b").unwrap(),
        Regex::new(r"(?i)\b(noon|morning|evening|night)\b").unwrap(),
        Regex::new(r"\b(\d{1,2}:\d{2})\b").unwrap(),
    ]
});

static QUOTED_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:set\s+reminder|remind(?:\s+me)?(?:\s+to)?|add\s+reminder)\s+["'](.+?)["'](?:\s+at|$)"#)
        .unwrap()
});
static SET_REMINDER_AT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:set\s+reminder|add\s+reminder)\s+(.+?)\s+at\s+").unwrap());
static REMIND_ME_TO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bremind(?:\s+me)?(?:\s+to)?\s+(.+?)(?:\s+at\s+|$)").unwrap());
static MARK_DONE_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bmark\s+(?:the\s+)?(.+?)\s+(?:as\s+)?(?:done|completed|complete)\b").unwrap()
});
static TITLE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:title|name):?\s*(.+?)(?:$|\s+at\s+|\s+time\s+)").unwrap());
static FOR_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfor\s+([a-z0-9 ,.'-]+?)(?:\s+at\b|$)").unwrap());
static GENERIC_SET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bset(?:\s+a)?\s+reminder(?:\s+to)?(?:\s+for)?\s+(.+?)(?:\s+at\b|$)").unwrap()
});

static TRAILING_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+in the morning\b|\s+at night\b").unwrap());

static COLON_TIME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{1,2}:\d{2})").unwrap());
static BARE_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{1,2})\b").unwrap());
static AM_HINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:am|morning)\b").unwrap());
static PM_HINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:pm|night|evening|tonight|sleep)\b").unwrap());
static ANY_MERIDIEM_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:am|pm|morning|night|evening|tonight|sleep)\b").unwrap()
});

/// Extracts `{time, task}` slots from a transcript.
pub fn extract(text: &str) -> Entities {
    let text = text.trim();
    // Same punctuation cleanup the time normalizer applies, so "10.52 a.m."
    // inside a sentence still scans as a colon time.
    let clean = DOT_SEPARATOR.replace_all(text, "$1:$2").replace('.', "");

    let mut time_match = None;
    for rx in TIME_PATTERNS.iter() {
        if let Some(caps) = rx.captures(&clean) {
            time_match = Some(caps[1].to_string());
            break;
        }
    }

    let title = find_title(text);

    let mut normalized = time_match.as_deref().and_then(time::normalize);
    // A bare number without its own meridiem can still be pinned down by
    // surrounding words ("at 7 tonight").
    if normalized.is_none() && ANY_MERIDIEM_WORD.is_match(&clean) {
        let number = COLON_TIME
            .captures(&clean)
            .or_else(|| BARE_NUMBER.captures(&clean))
            .map(|c| c[1].to_string());
        if let Some(number) = number {
            let hint = if AM_HINT.is_match(&clean) {
                Some("AM")
            } else if PM_HINT.is_match(&clean) {
                Some("PM")
            } else {
                None
            };
            if let Some(hint) = hint {
                normalized = time::normalize(&format!("{number} {hint}"));
            }
        }
    }

    let task = title.map(|t| {
        TRAILING_FRAGMENT
            .replacen(&t, 1, "")
            .trim()
            .to_string()
    });

    Entities {
        time: normalized,
        task: task.filter(|t| !t.is_empty()),
    }
}

/// Title search, first match wins.
fn find_title(text: &str) -> Option<String> {
    if let Some(caps) = QUOTED_TITLE.captures(text) {
        return Some(caps[1].trim().to_string());
    }
    if let Some(caps) = SET_REMINDER_AT.captures(text) {
        return Some(caps[1].trim().to_string());
    }
    if let Some(caps) = REMIND_ME_TO.captures(text) {
        return Some(caps[1].trim().to_string());
    }
    if let Some(caps) = MARK_DONE_TARGET.captures(text) {
        let target = caps[1].trim();
        // "mark it done" names no reminder.
        if !matches!(target.to_lowercase().as_str(), "it" | "this" | "that") {
            return Some(target.to_string());
        }
    }
    if let Some(caps) = TITLE_MARKER.captures(text) {
        return Some(caps[1].trim().to_string());
    }
    if let Some(caps) = FOR_CLAUSE.captures(text) {
        return Some(caps[1].trim().to_string());
    }
    if let Some(caps) = GENERIC_SET.captures(text) {
        return Some(caps[1].trim().to_string());
    }
    None
}
