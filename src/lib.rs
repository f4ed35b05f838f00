//! Client-side core of the tutoring portal: identity normalization, student
//! dedupe, general exam detection, month scoping and session rollups, plus a
//! typed client for the backend API and the dashboard state built on top.

pub mod auth;
pub mod classify;
pub mod config;
pub mod dashboard;
pub mod model;
pub mod months;
pub mod overview;
pub mod phone;
pub mod portal;
pub mod students;
pub mod summary;
pub mod upload;
