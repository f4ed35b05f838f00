//! View state for the parent and admin dashboards.
//!
//! The parent dashboard owns the only mutable state in the crate: which
//! students were loaded, which one is selected, the selected month and the
//! sessions last fetched. Student-list and session fetches share one
//! generation counter and a response is applied only if no newer load or
//! selection happened while it was in flight, so switching students or
//! parents quickly never shows the previous one's data.

use futures::future::join_all;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::model::{Session, StudentStats, UniqueStudent};
use crate::months;
use crate::overview::{self, Band, Overview};
use crate::portal::PortalApi;
use crate::students;
use crate::summary::{self, ExamGrade, Summary};

/// Monotonic request counter; only the latest ticket is current.
#[derive(Debug, Default)]
pub struct RequestGeneration(AtomicU64);

impl RequestGeneration {
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.0.load(Ordering::SeqCst) == ticket
    }
}

#[derive(Debug, Default)]
struct ViewState {
    phone: String,
    students: Vec<UniqueStudent>,
    selected: Option<UniqueStudent>,
    month: Option<u32>,
    sessions: Vec<Session>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub student: Option<UniqueStudent>,
    pub available_months: Vec<u32>,
    pub selected_month: Option<u32>,
    pub sessions: Vec<Session>,
    pub summary: Summary,
    pub general_exam: Option<ExamGrade>,
}

pub struct ParentDashboard<A> {
    api: A,
    exclude_general_exams: bool,
    generation: RequestGeneration,
    state: Mutex<ViewState>,
}

impl<A: PortalApi> ParentDashboard<A> {
    pub fn new(api: A, exclude_general_exams: bool) -> Self {
        Self {
            api,
            exclude_general_exams,
            generation: RequestGeneration::default(),
            state: Mutex::new(ViewState::default()),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Load the parent's students and select the first one. A backend
    /// failure leaves an empty list. The list is returned even when a newer
    /// load or selection superseded this one, but the view is left alone.
    #[instrument(skip_all)]
    pub async fn load_students(&self, phone: &str) -> Vec<UniqueStudent> {
        // Also invalidates session fetches still in flight for the old list.
        let ticket = self.generation.next();
        let raw = match self.api.parent_students(phone).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(?err, "failed to load students");
                Vec::new()
            }
        };
        let deduped = students::dedupe(&raw);
        let unique = students::unique_students(&deduped, phone);
        info!(raw = raw.len(), unique = unique.len(), "students loaded");

        {
            let mut state = self.state.lock().await;
            if !self.generation.is_current(ticket) {
                debug!(ticket, "discarding stale students response");
                return unique;
            }
            *state = ViewState {
                phone: phone.to_string(),
                students: unique.clone(),
                ..Default::default()
            };
        }
        if let Some(first) = unique.first() {
            self.select_student(&first.combined_id).await;
        }
        unique
    }

    pub async fn students(&self) -> Vec<UniqueStudent> {
        self.state.lock().await.students.clone()
    }

    /// Select a student by combined id, raw id or name and fetch their
    /// sessions. Returns `false` if the key matches nobody or if a newer
    /// selection superseded this one before its sessions arrived.
    #[instrument(skip(self))]
    pub async fn select_student(&self, key: &str) -> bool {
        let (ticket, phone, student) = {
            let mut state = self.state.lock().await;
            let Some(student) = students::find_student(&state.students, key).cloned() else {
                warn!(key, "no such student");
                return false;
            };
            state.selected = Some(student.clone());
            state.month = None;
            state.sessions.clear();
            (self.generation.next(), state.phone.clone(), student)
        };

        let sessions = self.fetch_sessions(&phone, &student).await;

        let mut state = self.state.lock().await;
        if !self.generation.is_current(ticket) {
            debug!(ticket, student = %student.combined_id, "discarding stale sessions response");
            return false;
        }
        info!(count = sessions.len(), student = %student.combined_id, "sessions applied");
        state.sessions = sessions;
        true
    }

    /// All sessions for every backend id behind `student`, fetched
    /// concurrently and concatenated in id order.
    async fn fetch_sessions(&self, phone: &str, student: &UniqueStudent) -> Vec<Session> {
        let requests = student
            .ids
            .iter()
            .map(|id| self.api.parent_sessions(phone, Some(id.as_str())));
        join_all(requests)
            .await
            .into_iter()
            .zip(student.ids.iter())
            .flat_map(|(res, id)| match res {
                Ok(raw) => raw.iter().map(Session::from_json).collect::<Vec<_>>(),
                Err(err) => {
                    warn!(?err, student_id = %id, "failed to load sessions");
                    Vec::new()
                }
            })
            .collect()
    }

    /// Month scope for the view; `None` shows every session.
    pub async fn select_month(&self, month: Option<u32>) {
        self.state.lock().await.month = month;
    }

    pub async fn view(&self) -> DashboardView {
        let state = self.state.lock().await;
        let filtered = months::filter_by_month(&state.sessions, state.month);
        DashboardView {
            student: state.selected.clone(),
            available_months: months::available_months(&state.sessions).into_iter().collect(),
            selected_month: state.month,
            summary: summary::summarize(filtered.iter().copied(), self.exclude_general_exams),
            general_exam: summary::general_exam_grade(filtered.iter().copied()),
            sessions: filtered.into_iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRow {
    pub student: StudentStats,
    pub attendance_band: Band,
    pub score_band: Band,
    pub payment_band: Band,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminView {
    pub overview: Overview,
    pub rows: Vec<AdminRow>,
}

/// Every student's rollup plus the totals shown on the admin dashboard.
#[instrument(skip_all)]
pub async fn admin_view<A: PortalApi + ?Sized>(api: &A) -> AdminView {
    let raw = match api.all_students().await {
        Ok(raw) => raw,
        Err(err) => {
            warn!(?err, "failed to load students");
            Vec::new()
        }
    };
    let stats: Vec<StudentStats> = raw.iter().map(StudentStats::from_json).collect();
    let rows = stats
        .iter()
        .map(|s| AdminRow {
            attendance_band: Band::for_percentage(s.attendance),
            score_band: Band::for_percentage(s.quizzes.average),
            payment_band: Band::for_payment(s.payments.paid, s.payments.total),
            student: s.clone(),
        })
        .collect();
    AdminView {
        overview: overview::overview(&stats),
        rows,
    }
}
