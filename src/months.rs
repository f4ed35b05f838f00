//! Month scoping for session lists.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;

use crate::model::Session;

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%d/%m/%Y", "%Y/%m/%d"];

/// Parse the calendar month out of a timestamp string, if it is in one of
/// the shapes the backend and the upload sheets produce.
pub fn parse_month(raw: &str) -> Option<u32> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.month());
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
    {
        return Some(dt.month());
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .map(|d| d.month())
}

/// Month of a session: `date` first, then start and end times.
pub fn session_month(session: &Session) -> Option<u32> {
    [&session.date, &session.start_time, &session.end_time]
        .into_iter()
        .find_map(|s| parse_month(s))
}

/// Months (1..=12) that have at least one session, ascending.
pub fn available_months(sessions: &[Session]) -> BTreeSet<u32> {
    sessions.iter().filter_map(session_month).collect()
}

/// Sessions in `month`, original order kept. `None` keeps everything; a
/// month with no sessions (or outside 1..=12) gives an empty list.
pub fn filter_by_month(sessions: &[Session], month: Option<u32>) -> Vec<&Session> {
    match month {
        None => sessions.iter().collect(),
        Some(m) => sessions
            .iter()
            .filter(|s| session_month(s) == Some(m))
            .collect(),
    }
}

/// English month name for display, `None` outside 1..=12.
pub fn month_name(month: u32) -> Option<&'static str> {
    const NAMES: [&str; 12] = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];
    month.checked_sub(1).and_then(|i| NAMES.get(i as usize)).copied()
}
