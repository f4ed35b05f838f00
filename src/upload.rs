//! Admin Excel upload: the sheet is forwarded as-is to the backend, which
//! does the parsing. Only the form metadata is checked here.

use std::path::PathBuf;
use thiserror::Error;
use tracing::{instrument, warn};

use crate::config::UploadSettings;
use crate::portal::PortalApi;

const ALLOWED_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("invalid file type {0:?}: only .xlsx and .xls files are allowed")]
    FileType(String),
    #[error("session number must be between 1 and {max}, got {got}")]
    SessionNumber { got: u32, max: u32 },
    #[error("invalid group {got:?}: must be one of {allowed}")]
    Group { got: String, allowed: String },
    #[error("quiz mark must be a non-negative number")]
    QuizMark,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub file: PathBuf,
    pub session_number: u32,
    pub group: String,
    pub is_general_exam: bool,
    /// Admin quiz mark; used as the denominator override for the sheet.
    pub quiz_mark: Option<f64>,
    pub finish_time: Option<String>,
    pub lecture_name: Option<String>,
    pub exam_name: Option<String>,
    pub has_exam_grade: bool,
    pub has_payment: bool,
    pub has_time: bool,
}

impl UploadRequest {
    pub fn new(file: impl Into<PathBuf>, session_number: u32, group: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            session_number,
            group: group.into(),
            is_general_exam: false,
            quiz_mark: None,
            finish_time: None,
            lecture_name: None,
            exam_name: None,
            has_exam_grade: true,
            has_payment: true,
            has_time: true,
        }
    }

    pub fn validate(&self, settings: &UploadSettings) -> Result<(), UploadError> {
        let ext = self
            .file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(UploadError::FileType(self.file.display().to_string()));
        }
        if self.session_number == 0 || self.session_number > settings.max_session_number {
            return Err(UploadError::SessionNumber {
                got: self.session_number,
                max: settings.max_session_number,
            });
        }
        if !settings.groups.iter().any(|g| g == &self.group) {
            return Err(UploadError::Group {
                got: self.group.clone(),
                allowed: settings.groups.join(", "),
            });
        }
        if let Some(mark) = self.quiz_mark {
            if !mark.is_finite() || mark < 0.0 {
                return Err(UploadError::QuizMark);
            }
        }
        Ok(())
    }

    /// Text fields of the multipart form, in the names the backend reads.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("session_number", self.session_number.to_string()),
            ("group", self.group.clone()),
            ("is_general_exam", self.is_general_exam.to_string()),
            ("has_exam_grade", self.has_exam_grade.to_string()),
            ("has_payment", self.has_payment.to_string()),
            ("has_time", self.has_time.to_string()),
        ];
        if let Some(mark) = self.quiz_mark {
            fields.push(("quiz_mark", mark.to_string()));
        }
        let optional = [
            ("finish_time", &self.finish_time),
            ("lecture_name", &self.lecture_name),
            ("exam_name", &self.exam_name),
        ];
        for (name, value) in optional {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                fields.push((name, v.to_string()));
            }
        }
        fields
    }
}

/// Upload limits as the backend publishes them (`groups`, `sessions`).
/// Each list falls back to the configured one when the backend is
/// unreachable or returns nothing.
#[instrument(skip_all)]
pub async fn backend_settings<A: PortalApi + ?Sized>(api: &A, configured: &UploadSettings) -> UploadSettings {
    let mut settings = configured.clone();
    match api.groups().await {
        Ok(groups) if !groups.is_empty() => settings.groups = groups,
        Ok(_) => {}
        Err(err) => warn!(?err, "failed to load groups, using configured list"),
    }
    match api.session_numbers().await {
        Ok(numbers) => {
            if let Some(max) = numbers.into_iter().max() {
                settings.max_session_number = max;
            }
        }
        Err(err) => warn!(?err, "failed to load session numbers, using configured limit"),
    }
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_request() {
        let req = UploadRequest::new("week3.XLSX", 3, "cam1");
        assert_eq!(req.validate(&UploadSettings::default()), Ok(()));
    }

    #[test]
    fn rejects_non_excel() {
        let req = UploadRequest::new("week3.csv", 3, "cam1");
        assert!(matches!(req.validate(&UploadSettings::default()), Err(UploadError::FileType(_))));
        let req = UploadRequest::new("noext", 3, "cam1");
        assert!(matches!(req.validate(&UploadSettings::default()), Err(UploadError::FileType(_))));
    }

    #[test]
    fn session_number_range() {
        let settings = UploadSettings::default();
        for n in [0, 9] {
            let req = UploadRequest::new("a.xls", n, "west");
            assert_eq!(req.validate(&settings), Err(UploadError::SessionNumber { got: n, max: 8 }));
        }
        assert!(UploadRequest::new("a.xls", 8, "west").validate(&settings).is_ok());
    }

    #[test]
    fn unknown_group() {
        let err = UploadRequest::new("a.xls", 1, "east").validate(&UploadSettings::default()).unwrap_err();
        assert!(err.to_string().contains("station3"));
    }

    #[test]
    fn negative_quiz_mark() {
        let mut req = UploadRequest::new("a.xls", 1, "west");
        req.quiz_mark = Some(-1.0);
        assert_eq!(req.validate(&UploadSettings::default()), Err(UploadError::QuizMark));
    }

    #[test]
    fn form_fields_skip_blank_optionals() {
        let mut req = UploadRequest::new("exam.xlsx", 2, "maimi");
        req.is_general_exam = true;
        req.quiz_mark = Some(60.0);
        req.exam_name = Some("Shamel 1".into());
        req.lecture_name = Some("   ".into());
        req.has_payment = false;
        let fields = req.form_fields();
        let get = |k: &str| fields.iter().find(|(n, _)| *n == k).map(|(_, v)| v.as_str());
        assert_eq!(get("session_number"), Some("2"));
        assert_eq!(get("is_general_exam"), Some("true"));
        assert_eq!(get("has_payment"), Some("false"));
        assert_eq!(get("quiz_mark"), Some("60"));
        assert_eq!(get("exam_name"), Some("Shamel 1"));
        assert_eq!(get("lecture_name"), None);
        assert_eq!(get("finish_time"), None);
    }
}
