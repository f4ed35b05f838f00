//! Attendance, quiz and payment rollups over a session list.

use serde::{Deserialize, Serialize};

use crate::model::{Attendance, Session};

/// Denominator shown for a general exam that has neither an admin mark nor
/// a recorded total.
pub const DEFAULT_GENERAL_EXAM_TOTAL: u32 = 60;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub session_count: u32,
    pub attended_count: u32,
    pub missed_count: u32,
    pub attendance_percentage: u32,
    pub quiz_correct_total: u64,
    pub quiz_possible_total: u64,
    pub quiz_percentage: u32,
    pub payment_total: f64,
}

/// Roll up `sessions`.
///
/// With `exclude_general_exams`, general exams are left out of the session,
/// attendance and quiz figures but their payments still count: an exam can
/// carry a fee without dragging down quiz averages.
pub fn summarize<'a, I>(sessions: I, exclude_general_exams: bool) -> Summary
where
    I: IntoIterator<Item = &'a Session>,
{
    let mut out = Summary::default();
    for session in sessions {
        out.payment_total += session.payment;

        if exclude_general_exams && session.is_general_exam() {
            continue;
        }
        out.session_count += 1;
        match session.attendance {
            Attendance::Attended => {
                out.attended_count += 1;
                out.quiz_correct_total += u64::from(session.quiz_correct);
                out.quiz_possible_total += u64::from(session.quiz_denominator());
            }
            Attendance::Missed => out.missed_count += 1,
            Attendance::Upcoming => {}
        }
    }
    out.attendance_percentage = percentage(u64::from(out.attended_count), u64::from(out.session_count));
    out.quiz_percentage = percentage(out.quiz_correct_total, out.quiz_possible_total);
    out
}

/// `round(part / whole * 100)`, 0 when `whole` is 0.
pub fn percentage(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExamGrade {
    pub score: u32,
    pub total: u32,
    pub label: String,
}

/// Grade of the first attended general exam, if any.
pub fn general_exam_grade<'a, I>(sessions: I) -> Option<ExamGrade>
where
    I: IntoIterator<Item = &'a Session>,
{
    let exam = sessions
        .into_iter()
        .find(|s| s.is_general_exam() && s.attendance == Attendance::Attended)?;
    let total = match exam.quiz_denominator() {
        0 => DEFAULT_GENERAL_EXAM_TOTAL,
        n => n,
    };
    let label = if !exam.name.is_empty() {
        exam.name.clone()
    } else {
        exam.lecture_name
            .clone()
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| "General Exam".to_string())
    };
    Some(ExamGrade {
        score: exam.quiz_correct,
        total,
        label,
    })
}
