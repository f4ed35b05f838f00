//! Collapsing the backend's student records into the list a parent picks from.
//!
//! Two passes: [`dedupe`] drops repeated records (same backend id, or same
//! name/student number when there is no id), then [`unique_students`] groups
//! what is left by `(parent number, name)` into [`UniqueStudent`]s.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::model::{text, Student, UniqueStudent};
use crate::phone;

const KEY_SEPARATOR: &str = "|";

/// Identity key for a raw record. Prefers the backend id; falls back to the
/// name and student number; records with none of these are keyed on their
/// full JSON text so they are never merged with anything but an exact copy.
pub fn dedupe_key(record: &Value) -> String {
    if let Some(id) = text(record, &["id", "student_id"]) {
        return format!("id:{id}");
    }
    let parts: Vec<String> = [
        text(record, &["name", "student_name"]),
        text(record, &["student_no"]),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !parts.is_empty() {
        return format!("fields:{}", parts.join(KEY_SEPARATOR));
    }
    format!("raw:{record}")
}

/// Order-preserving dedupe; the first record for each key wins.
pub fn dedupe(records: &[Value]) -> Vec<Student> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for record in records {
        let key = dedupe_key(record);
        if seen.insert(key.clone()) {
            out.push(Student::from_json(record));
        } else {
            debug!(%key, "dropping duplicate student record");
        }
    }
    out
}

/// Group students by `(normalized parent, exact name)`. Records without a
/// parent number are attributed to `default_parent` (the signed-in parent).
pub fn unique_students(students: &[Student], default_parent: &str) -> Vec<UniqueStudent> {
    let fallback_parent = phone::normalize(default_parent);
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<UniqueStudent> = Vec::new();

    for student in students {
        let parent = if student.parent_number.is_empty() {
            fallback_parent.clone()
        } else {
            phone::normalize(&student.parent_number)
        };
        let combined_id = UniqueStudent::combined_id(&parent, &student.name);
        let slot = *index.entry(combined_id.clone()).or_insert_with(|| {
            out.push(UniqueStudent {
                parent_number: parent,
                name: student.name.clone(),
                grade: student.grade.clone(),
                combined_id,
                ids: Default::default(),
            });
            out.len() - 1
        });
        if !student.raw_id.is_empty() {
            out[slot].ids.insert(student.raw_id.clone());
        }
    }
    out
}

/// Resolve a selection by combined id, then raw backend id, then exact name.
pub fn find_student<'a>(students: &'a [UniqueStudent], key: &str) -> Option<&'a UniqueStudent> {
    students
        .iter()
        .find(|s| s.combined_id == key)
        .or_else(|| students.iter().find(|s| s.ids.contains(key)))
        .or_else(|| students.iter().find(|s| s.name == key))
}
