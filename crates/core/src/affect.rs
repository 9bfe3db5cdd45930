//! Lexical affect estimation with optional acoustic fusion.
//!
//! Text scoring uses a small polarity lexicon with negation and intensifier
//! handling, a direct "I feel <adjective>" override, and ordered keyword
//! category boosts. An externally supplied acoustic estimate always takes
//! precedence when present; the lexical result is only the fallback.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Coarse emotional-state label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Neutral,
    Happy,
    Sad,
    Angry,
    Stressed,
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Emotion::Neutral => "neutral",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Stressed => "stressed",
        };
        write!(f, "{label}")
    }
}

/// An emotion label with its confidence in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffectResult {
    pub emotion: Emotion,
    pub confidence: f64,
}

impl AffectResult {
    /// Fuses this lexical estimate with an externally supplied acoustic one.
    ///
    /// The external emotion wins whenever present; the external confidence
    /// wins whenever nonzero. The core never computes acoustic features.
    pub fn fuse(self, voice_emotion: Option<Emotion>, voice_confidence: f64) -> AffectResult {
        AffectResult {
            emotion: voice_emotion.unwrap_or(self.emotion),
            confidence: if voice_confidence > 0.0 {
                voice_confidence
            } else {
                self.confidence
            },
        }
    }
}

/// Polarity lexicon, weights in `[-1, 1]`.
const LEXICON: &[(&str, f64)] = &[
    ("happy", 1.0),
    ("great", 1.0),
    ("good", 0.9),
    ("fine", 0.8),
    ("thanks", 0.9),
    ("thank", 0.9),
    ("awesome", 1.0),
    ("amazing", 1.0),
    ("ok", 0.3),
    ("okay", 0.4),
    ("sorry", -0.6),
    ("sad", -1.0),
    ("upset", -0.9),
    ("lonely", -0.8),
    ("frustrated", -0.9),
    ("frustrating", -0.85),
    ("angry", -1.0),
    ("mad", -0.9),
    ("panic", -0.95),
    ("scared", -0.9),
    ("help", -0.8),
    ("terrible", -1.0),
    ("awful", -1.0),
    ("bored", -0.4),
];

// Apostrophes are token separators, so the contracted negators appear here in
// their tokenized forms.
const NEGATORS: &[&str] = &["not", "never", "no", "hardly", "cannot", "dont", "didnt", "cant"];
const INTENSIFIERS: &[&str] = &["very", "so", "really", "extremely"];

static BOOSTS: LazyLock<Vec<(Regex, Emotion)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"angry|frustrat|mad|irritat|annoyed|furious").unwrap(),
            Emotion::Angry,
        ),
        (
            Regex::new(r"help|panic|emergency|scared").unwrap(),
            Emotion::Stressed,
        ),
        (Regex::new(r"sad|upset|lonely").unwrap(), Emotion::Sad),
        (
            Regex::new(r"great|good|happy|fine|thanks|thank you").unwrap(),
            Emotion::Happy,
        ),
    ]
});

static FEEL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\bfeel(?:\s+(very|so|really))?\s+(happy|sad|scared|angry|frustrated|upset|lonely|good|fine)\b",
    )
    .unwrap()
});

fn lexicon_weight(token: &str) -> Option<f64> {
    LEXICON.iter().find(|(w, _)| *w == token).map(|(_, v)| *v)
}

/// Estimates an emotion label and confidence from text alone.
pub fn estimate(text: &str) -> AffectResult {
    let lower = text.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    // Lexicon pass with a two-token lookbehind window for negators and
    // intensifiers.
    let mut score = 0.0;
    let mut matched = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        let Some(mut weight) = lexicon_weight(token) else {
            continue;
        };
        let prev1 = i.checked_sub(1).map(|j| tokens[j]);
        let prev2 = i.checked_sub(2).map(|j| tokens[j]);
        if prev1.is_some_and(|t| NEGATORS.contains(&t)) {
            weight = -weight;
        }
        if prev2.is_some_and(|t| NEGATORS.contains(&t)) {
            weight = -weight;
        }
        if prev1.is_some_and(|t| INTENSIFIERS.contains(&t)) {
            weight *= 1.5;
        }
        if prev2.is_some_and(|t| INTENSIFIERS.contains(&t)) {
            weight *= 1.3;
        }
        matched += 1;
        score += weight;
    }
    if matched > 0 {
        score /= matched as f64;
    } else if !tokens.is_empty() {
        score /= tokens.len() as f64;
    }

    // Keyword category boost, first match wins.
    let mut detected = BOOSTS
        .iter()
        .find(|(rx, _)| rx.is_match(&lower))
        .map(|(_, emotion)| *emotion);

    // Direct "I feel <adjective>" phrasing overrides the category.
    if let Some(caps) = FEEL_PATTERN.captures(&lower) {
        let adjective = &caps[2];
        let intensified = caps.get(1).is_some();
        let mapped = match adjective {
            "happy" | "good" | "fine" => Some(Emotion::Happy),
            "sad" | "upset" | "lonely" => Some(Emotion::Sad),
            "frustrated" | "angry" => Some(Emotion::Angry),
            "scared" => Some(Emotion::Stressed),
            _ => None,
        };
        if let Some(emotion) = mapped {
            detected = Some(emotion);
            let floor = match adjective {
                "happy" => 0.6,
                "scared" => -0.6,
                "sad" => -0.7,
                _ => 0.6,
            };
            score = score.max(floor);
            if intensified {
                score *= 1.3;
            }
        }
    }

    let (emotion, confidence) = match detected {
        Some(emotion) => {
            let mut confidence = 0.5 + score.abs().min(0.45);
            if emotion == Emotion::Angry {
                confidence = confidence.max(0.75);
            }
            if emotion == Emotion::Stressed {
                confidence = confidence.max(0.65);
            }
            (emotion, confidence)
        }
        None if score <= -0.5 => (Emotion::Sad, (0.45 + score.abs()).min(0.85)),
        None if score >= 0.5 => (Emotion::Happy, (0.45 + score).min(0.85)),
        None => (Emotion::Neutral, 0.35 + score.abs() * 0.35),
    };

    AffectResult {
        emotion,
        confidence: (confidence.clamp(0.0, 1.0) * 100.0).round() / 100.0,
    }
}
