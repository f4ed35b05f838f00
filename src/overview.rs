//! Admin-side statistics over the backend's per-student rollups.

use serde::{Deserialize, Serialize};

use crate::model::StudentStats;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_students: usize,
    pub average_attendance: u32,
    pub total_paid: f64,
    pub average_quiz_score: u32,
}

pub fn overview(students: &[StudentStats]) -> Overview {
    if students.is_empty() {
        return Overview::default();
    }
    let n = students.len() as f64;
    let attendance: f64 = students.iter().map(|s| s.attendance).sum();
    let quiz: f64 = students.iter().map(|s| s.quizzes.average).sum();
    Overview {
        total_students: students.len(),
        average_attendance: (attendance / n).round().max(0.0) as u32,
        total_paid: students.iter().map(|s| s.payments.paid).sum(),
        average_quiz_score: (quiz / n).round().max(0.0) as u32,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Band {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl Band {
    /// Band for a 0..=100 attendance or score percentage.
    pub fn for_percentage(pct: f64) -> Self {
        if pct >= 90.0 {
            Band::Excellent
        } else if pct >= 75.0 {
            Band::Good
        } else if pct >= 60.0 {
            Band::Fair
        } else {
            Band::Poor
        }
    }

    /// Fully paid is the only excellent payment state.
    pub fn for_payment(paid: f64, total: f64) -> Self {
        if total <= 0.0 {
            return Band::Poor;
        }
        let pct = paid / total * 100.0;
        if pct >= 100.0 {
            Band::Excellent
        } else if pct >= 75.0 {
            Band::Good
        } else if pct >= 50.0 {
            Band::Fair
        } else {
            Band::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Band::Excellent => "excellent",
            Band::Good => "good",
            Band::Fair => "fair",
            Band::Poor => "poor",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Payments, Quizzes};

    fn stats(attendance: f64, paid: f64, quiz_avg: f64) -> StudentStats {
        StudentStats {
            attendance,
            payments: Payments { paid, total: 560.0 },
            quizzes: Quizzes { average: quiz_avg, total: 8 },
            ..Default::default()
        }
    }

    #[test]
    fn averages_over_students() {
        let o = overview(&[stats(85.0, 420.0, 88.0), stats(92.0, 560.0, 94.0)]);
        assert_eq!(o.total_students, 2);
        assert_eq!(o.average_attendance, 89);
        assert_eq!(o.total_paid, 980.0);
        assert_eq!(o.average_quiz_score, 91);
    }

    #[test]
    fn empty_overview() {
        assert_eq!(overview(&[]), Overview::default());
    }

    #[test]
    fn bands() {
        assert_eq!(Band::for_percentage(90.0), Band::Excellent);
        assert_eq!(Band::for_percentage(75.0), Band::Good);
        assert_eq!(Band::for_percentage(60.0), Band::Fair);
        assert_eq!(Band::for_percentage(59.9), Band::Poor);

        assert_eq!(Band::for_payment(560.0, 560.0), Band::Excellent);
        assert_eq!(Band::for_payment(420.0, 560.0), Band::Good);
        assert_eq!(Band::for_payment(280.0, 560.0), Band::Fair);
        assert_eq!(Band::for_payment(100.0, 560.0), Band::Poor);
        assert_eq!(Band::for_payment(100.0, 0.0), Band::Poor);
    }
}
