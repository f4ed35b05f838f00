//! General exam ("shamel") detection.
//!
//! Upstream records are tagged inconsistently: the flag may be spelled four
//! different ways, typed as bool, string or integer, or missing entirely.
//! A session counts as a general exam when either the flag says so or its
//! name contains one of the exam keywords. A regular lecture whose title
//! happens to contain a keyword is misclassified; that is a known limit of
//! the keyword fallback.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::model::Session;

pub const FLAG_FIELDS: [&str; 4] = ["is_general_exam", "isGeneralExam", "general_exam", "generalExam"];

pub const KEYWORDS: [&str; 4] = ["shamel", "شامل", "general exam", "امتحان عام"];

static KEYWORD_RE: Lazy<Regex> = Lazy::new(|| {
    let alternation = KEYWORDS
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i){alternation}")).expect("keyword pattern is valid")
});

/// True when any of the known flag fields is `true`, `"true"` or `1`.
/// The string form ignores surrounding whitespace and ASCII case.
pub fn flag_signal(record: &Value) -> bool {
    FLAG_FIELDS
        .iter()
        .filter_map(|f| record.get(f))
        .any(is_truthy_flag)
}

fn is_truthy_flag(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        Value::Number(n) => n.as_i64() == Some(1) || n.as_f64() == Some(1.0),
        _ => false,
    }
}

/// True when the session or lecture name contains an exam keyword.
pub fn keyword_signal(name: &str, lecture_name: Option<&str>) -> bool {
    KEYWORD_RE.is_match(name) || lecture_name.is_some_and(|l| KEYWORD_RE.is_match(l))
}

pub fn is_general_exam(session: &Session) -> bool {
    session.general_exam_flag || keyword_signal(&session.name, session.lecture_name.as_deref())
}
