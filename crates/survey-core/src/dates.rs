use std::sync::OnceLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use tracing::debug;

// ── JoinDateParser ────────────────────────────────────────────────────────────

/// Full calendar-date patterns, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parses the free-form "when did you first join" answers.
///
/// Respondents write anything from an ISO date to "sometime in the 90s".
/// Only answers that pin down a calendar year are accepted; everything else
/// yields `None` and is treated as missing downstream.
pub struct JoinDateParser;

impl JoinDateParser {
    /// Parse `raw` into a calendar date. Year-only and year-month answers
    /// resolve to the first day of the period.
    pub fn parse(raw: &str) -> Option<NaiveDate> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }

        for fmt in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return Some(date);
            }
        }

        for fmt in DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(dt.date());
            }
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.date_naive());
        }

        // Year-month answers: chrono needs a day, so supply the first.
        let partial = [
            (format!("{}-01", s), "%Y-%m-%d"),
            (format!("01/{}", s), "%d/%m/%Y"),
            (format!("1 {}", s), "%d %B %Y"),
            (format!("1 {}", s), "%d %b %Y"),
        ];
        for (candidate, fmt) in &partial {
            if let Ok(date) = NaiveDate::parse_from_str(candidate, fmt) {
                return Some(date);
            }
        }

        if let Some(caps) = bare_year().captures(s) {
            let year: i32 = caps[1].parse().ok()?;
            return NaiveDate::from_ymd_opt(year, 1, 1);
        }

        debug!("JoinDateParser: unparsable join date \"{}\"", s);
        None
    }

    /// Calendar year of the parsed join date.
    pub fn year(raw: &str) -> Option<i32> {
        Self::parse(raw).map(|d| d.year())
    }
}

fn bare_year() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})$").expect("regex is valid"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
