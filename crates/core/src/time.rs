//! Spoken time-phrase normalization.
//!
//! Maps the raw time fragments people actually say ("10.52 a.m.", "22:52",
//! "noon", "7") onto one canonical `"H:MM AM/PM"` form. Unparseable input is
//! `None`, never an error; callers pick a domain default.

use regex::Regex;
use std::sync::LazyLock;

static MERIDIEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})(?::(\d{2}))?\s*(AM|PM)$").unwrap());
static TWENTY_FOUR_HOUR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").unwrap());
static BARE_HOUR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{1,2})$").unwrap());
static DOT_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d)\.(\d)").unwrap());

/// Normalizes a raw time phrase to canonical `"H:MM AM/PM"`.
///
/// Rules are applied in priority order: literal keywords, explicit meridiem
/// times, 24-hour clock, bare hours. Punctuation and case are insignificant,
/// so `"10.52 p.m."` reads the same as `"10:52 PM"`.
pub fn normalize(raw: &str) -> Option<String> {
    let upper = raw.trim().to_uppercase();
    // Dots between digits are a time separator; dots in "A.M."/"P.M." are noise.
    let s = DOT_SEPARATOR.replace_all(&upper, "$1:$2").replace('.', "");
    let s = s.trim();

    match s {
        "NOON" => return Some("12:00 PM".to_string()),
        "MORNING" => return Some("9:00 AM".to_string()),
        "EVENING" => return Some("6:00 PM".to_string()),
        "NIGHT" => return Some("10:00 PM".to_string()),
        _ => {}
    }

    if let Some(caps) = MERIDIEM.captures(s) {
        let hour: u32 = caps[1].parse().ok()?;
        let minutes = caps.get(2).map_or("00", |m| m.as_str());
        return Some(format!("{hour}:{minutes} {}", &caps[3]));
    }

    if let Some(caps) = TWENTY_FOUR_HOUR.captures(s) {
        let mut hour: u32 = caps[1].parse().ok()?;
        let minutes = &caps[2];
        let meridiem = if hour >= 12 { "PM" } else { "AM" };
        if hour == 0 {
            hour = 12;
        } else if hour > 12 {
            hour -= 12;
        }
        return Some(format!("{hour}:{minutes} {meridiem}"));
    }

    if let Some(caps) = BARE_HOUR.captures(s) {
        let hour: u32 = caps[1].parse().ok()?;
        return match hour {
            1..=11 => Some(format!("{hour}:00 AM")),
            12 => Some("12:00 PM".to_string()),
            13..=23 => Some(format!("{}:00 PM", hour - 12)),
            _ => None,
        };
    }

    None
}
