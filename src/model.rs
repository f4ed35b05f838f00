use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::classify;
use crate::phone;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Attendance {
    Attended,
    #[default]
    Upcoming,
    Missed,
}

impl Attendance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attendance::Attended => "attended",
            Attendance::Upcoming => "upcoming",
            Attendance::Missed => "missed",
        }
    }

    /// Accepts the dashboard strings as well as the raw `1`/`0` flags stored
    /// by the upload pipeline. Anything else is `Upcoming`.
    fn from_json(value: Option<&Value>) -> Self {
        match value {
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "attended" | "1" | "true" => Attendance::Attended,
                "missed" | "0" | "false" => Attendance::Missed,
                _ => Attendance::Upcoming,
            },
            Some(Value::Number(n)) => match n.as_f64() {
                Some(x) if x == 1.0 => Attendance::Attended,
                Some(x) if x == 0.0 => Attendance::Missed,
                _ => Attendance::Upcoming,
            },
            Some(Value::Bool(true)) => Attendance::Attended,
            Some(Value::Bool(false)) => Attendance::Missed,
            _ => Attendance::Upcoming,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HomeworkStatus {
    #[default]
    Completed,
    Pending,
}

impl HomeworkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HomeworkStatus::Completed => "completed",
            HomeworkStatus::Pending => "pending",
        }
    }

    // Upload codes: null/0 = done, 1 = no homework, 2 = not done, 3 = cheated.
    fn from_json(value: Option<&Value>) -> Self {
        match value {
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "pending" => HomeworkStatus::Pending,
                "" | "0" | "completed" => HomeworkStatus::Completed,
                _ => HomeworkStatus::Pending,
            },
            Some(Value::Number(n)) if n.as_f64() != Some(0.0) => HomeworkStatus::Pending,
            _ => HomeworkStatus::Completed,
        }
    }
}

/// One student record as returned by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Student {
    pub raw_id: String,
    pub name: String,
    pub grade: String,
    /// Normalized; empty when the record carries no parent number.
    pub parent_number: String,
    pub student_no: Option<String>,
}

impl Student {
    pub fn from_json(value: &Value) -> Self {
        let parent = text(value, &["parent_no", "parent_number", "phone_number"]).unwrap_or_default();
        Self {
            raw_id: text(value, &["id", "student_id"]).unwrap_or_default(),
            name: text(value, &["name", "student_name"]).unwrap_or_default(),
            grade: text(value, &["grade"]).unwrap_or_default(),
            parent_number: phone::normalize(&parent),
            student_no: text(value, &["student_no"]),
        }
    }
}

/// A student as the parent sees it: one entry per (parent, name), possibly
/// backed by several backend ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UniqueStudent {
    pub parent_number: String,
    pub name: String,
    pub grade: String,
    pub combined_id: String,
    pub ids: BTreeSet<String>,
}

impl UniqueStudent {
    pub fn combined_id(parent_number: &str, name: &str) -> String {
        format!("{parent_number}_{name}")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub chapter: Option<i64>,
    pub name: String,
    pub lecture_name: Option<String>,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub attendance: Attendance,
    pub quiz_correct: u32,
    pub quiz_total: u32,
    /// Administrator override of the quiz denominator.
    pub admin_quiz_mark: Option<u32>,
    pub payment: f64,
    pub homework_status: HomeworkStatus,
    /// Result of the explicit-flag half of the general exam check only.
    pub general_exam_flag: bool,
}

impl Session {
    /// Build a session from a raw backend record. Missing or malformed
    /// fields fall back to empty strings, zero and `false`.
    pub fn from_json(value: &Value) -> Self {
        let chapter = number(value, &["chapter", "session_number"]).map(|n| n as i64);
        let lecture_name = text(value, &["lectureName", "lecture_name", "exam_name"]);
        let name = text(value, &["name"])
            .or_else(|| lecture_name.clone())
            .unwrap_or_else(|| match chapter {
                Some(c) => format!("Session {c}"),
                None => String::new(),
            });
        Self {
            id: text(value, &["id", "student_no", "student_id"]).unwrap_or_default(),
            chapter,
            name,
            lecture_name,
            date: text(value, &["date", "finish_time"]).unwrap_or_default(),
            start_time: text(value, &["startTime", "start_time"]).unwrap_or_default(),
            end_time: text(value, &["endTime", "end_time", "finish_time"]).unwrap_or_default(),
            attendance: Attendance::from_json(field(value, &["attendance"])),
            quiz_correct: count(value, &["quizCorrect", "quiz_correct", "quiz_mark"]).unwrap_or(0),
            quiz_total: count(value, &["quizTotal", "quiz_total"]).unwrap_or(0),
            admin_quiz_mark: count(value, &["adminQuizMark", "admin_quiz_mark"]).filter(|m| *m > 0),
            payment: number(value, &["payment"]).unwrap_or(0.0),
            homework_status: HomeworkStatus::from_json(field(value, &["homeworkStatus", "homework_status"])),
            general_exam_flag: classify::flag_signal(value),
        }
    }

    pub fn is_general_exam(&self) -> bool {
        classify::is_general_exam(self)
    }

    /// Quiz denominator: the admin mark wins over the recorded total.
    pub fn quiz_denominator(&self) -> u32 {
        self.admin_quiz_mark.unwrap_or(self.quiz_total)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Payments {
    pub paid: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Quizzes {
    pub average: f64,
    pub total: u32,
}

/// Per-student rollup computed by the backend for the admin listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StudentStats {
    pub id: String,
    pub name: String,
    pub grade: String,
    /// Attendance percentage, 0..=100.
    pub attendance: f64,
    pub payments: Payments,
    pub quizzes: Quizzes,
}

impl StudentStats {
    pub fn from_json(value: &Value) -> Self {
        let payments = field(value, &["payments"]);
        let quizzes = field(value, &["quizzes"]);
        Self {
            id: text(value, &["id", "student_id"]).unwrap_or_default(),
            name: text(value, &["name", "student_name"]).unwrap_or_default(),
            grade: text(value, &["grade"]).unwrap_or_default(),
            attendance: number(value, &["attendance"]).unwrap_or(0.0),
            payments: Payments {
                paid: payments.and_then(|p| number(p, &["paid"])).unwrap_or(0.0),
                total: payments.and_then(|p| number(p, &["total"])).unwrap_or(0.0),
            },
            quizzes: Quizzes {
                average: quizzes.and_then(|q| number(q, &["average"])).unwrap_or(0.0),
                total: quizzes.and_then(|q| count(q, &["total"])).unwrap_or(0),
            },
        }
    }
}

/// First non-null value among `keys`.
pub(crate) fn field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| value.get(k))
        .find(|v| !v.is_null())
}

/// Non-empty trimmed string; numbers are rendered as text.
pub(crate) fn text(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().filter_map(|k| value.get(k)).find_map(|v| match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(match n.as_f64() {
            Some(f) if f.fract() == 0.0 && n.is_f64() => format!("{}", f as i64),
            _ => n.to_string(),
        }),
        _ => None,
    })
}

/// Finite number from a JSON number or numeric string.
pub(crate) fn number(value: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|k| value.get(k))
        .find_map(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|n| n.is_finite())
}

/// Non-negative whole count; fractions are truncated, negatives clamp to 0.
pub(crate) fn count(value: &Value, keys: &[&str]) -> Option<u32> {
    number(value, keys).map(|n| n.max(0.0) as u32)
}
