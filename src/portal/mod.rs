use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::phone;
use crate::portal::model::{
    AuthResponse, GroupsResp, SessionNumbersResp, SessionsResp, StudentsResp, UploadResponse,
};
use crate::upload::UploadRequest;

pub mod model;

const DEFAULT_API_BASE: &str = "http://localhost:5000/api/";

/// Raw access to the tutoring backend. Records come back as untyped JSON;
/// turning them into domain types is the caller's business.
#[async_trait]
pub trait PortalApi: Send + Sync {
    async fn parent_students(&self, phone: &str) -> Result<Vec<Value>>;

    async fn parent_sessions(&self, phone: &str, student_id: Option<&str>) -> Result<Vec<Value>>;

    async fn all_students(&self) -> Result<Vec<Value>>;

    async fn groups(&self) -> Result<Vec<String>>;

    /// Session numbers the upload form accepts.
    async fn session_numbers(&self) -> Result<Vec<u32>>;

    async fn upload_excel(&self, req: &UploadRequest) -> Result<UploadResponse>;

    async fn parent_login(&self, phone: &str, password: &str) -> Result<AuthResponse>;

    /// First-login password reset; clears `needs_password_reset`.
    async fn reset_password(&self, phone: &str, new_password: &str) -> Result<AuthResponse>;

    async fn change_password(&self, phone: &str, current: &str, new_password: &str) -> Result<AuthResponse>;

    async fn admin_login(&self, username: &str, password: &str) -> Result<AuthResponse>;

    async fn admin_change_password(
        &self,
        username: &str,
        current: &str,
        new_password: &str,
    ) -> Result<AuthResponse>;
}

#[derive(Clone)]
pub struct PortalClient {
    http: Client,
    base_url: Url,
}

impl fmt::Debug for PortalClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl PortalClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        let http = Client::builder()
            .user_agent("tutor-portal/0.1")
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, base_url })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            &cfg.resolved_base_url(),
            Duration::from_secs(cfg.backend.timeout_seconds),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for `path` relative to the API base, with query pairs.
    pub fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path)
            .with_context(|| format!("invalid endpoint path {path}"))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "GET");
        let res = self
            .http
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("failed to reach backend at {url}"))?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(%url, %status, "backend error");
            return Err(anyhow!("backend error {}: {}", status, body));
        }
        res.json::<T>()
            .await
            .with_context(|| format!("invalid JSON from {url}"))
    }

    /// POST a JSON body to an auth endpoint. A rejection still carries an
    /// [`AuthResponse`] body, so any status with a parsable body is returned
    /// as-is and only unreadable replies become errors.
    async fn post_auth(&self, path: &str, body: &Value) -> Result<AuthResponse> {
        let url = self.endpoint(path, &[])?;
        debug!(%url, "POST");
        let res = self
            .http
            .post(url.clone())
            .json(body)
            .send()
            .await
            .with_context(|| format!("failed to reach backend at {url}"))?;
        let status = res.status();
        let text = res.text().await.context("failed to read auth response")?;
        match serde_json::from_str::<AuthResponse>(&text) {
            Ok(resp) => {
                if !resp.success {
                    warn!(%url, %status, message = resp.message.as_deref().unwrap_or(""), "auth rejected");
                }
                Ok(resp)
            }
            Err(_) if !status.is_success() => Err(anyhow!("backend error {}: {}", status, text)),
            Err(err) => Err(err).with_context(|| format!("invalid JSON from {url}")),
        }
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    let raw = if raw.is_empty() { DEFAULT_API_BASE } else { raw };
    // `Url::join` drops the last segment unless the base ends with '/'.
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&with_slash).with_context(|| format!("invalid backend base URL {raw}"))
}

#[async_trait]
impl PortalApi for PortalClient {
    #[instrument(skip_all)]
    async fn parent_students(&self, phone: &str) -> Result<Vec<Value>> {
        let phone = phone::normalize(phone);
        let url = self.endpoint("parent/students", &[("phone_number", phone.as_str())])?;
        let resp: StudentsResp = self.get_json(url).await?;
        info!(count = resp.students.len(), "fetched parent students");
        Ok(resp.students)
    }

    #[instrument(skip_all, fields(student_id = student_id.unwrap_or("")))]
    async fn parent_sessions(&self, phone: &str, student_id: Option<&str>) -> Result<Vec<Value>> {
        let phone = phone::normalize(phone);
        let mut query = vec![("phone_number", phone.as_str())];
        if let Some(id) = student_id {
            query.push(("student_id", id));
        }
        let url = self.endpoint("parent/sessions", &query)?;
        let resp: SessionsResp = self.get_json(url).await?;
        info!(count = resp.sessions.len(), "fetched sessions");
        Ok(resp.sessions)
    }

    #[instrument(skip_all)]
    async fn all_students(&self) -> Result<Vec<Value>> {
        let url = self.endpoint("students", &[])?;
        let resp: StudentsResp = self.get_json(url).await?;
        info!(count = resp.students.len(), "fetched all students");
        Ok(resp.students)
    }

    #[instrument(skip_all)]
    async fn groups(&self) -> Result<Vec<String>> {
        let url = self.endpoint("groups", &[])?;
        let resp: GroupsResp = self.get_json(url).await?;
        Ok(resp.groups)
    }

    #[instrument(skip_all)]
    async fn session_numbers(&self) -> Result<Vec<u32>> {
        let url = self.endpoint("sessions", &[])?;
        let resp: SessionNumbersResp = self.get_json(url).await?;
        Ok(resp.sessions)
    }

    #[instrument(skip_all, fields(file = %req.file.display()))]
    async fn upload_excel(&self, req: &UploadRequest) -> Result<UploadResponse> {
        let file_name = req
            .file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("invalid file name"))?
            .to_string();
        let content = tokio::fs::read(&req.file)
            .await
            .with_context(|| format!("failed to read file: {}", req.file.display()))?;

        let mut form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(content)
                .file_name(file_name.clone())
                .mime_str(content_type(&file_name))?,
        );
        for (name, value) in req.form_fields() {
            form = form.text(name, value);
        }

        let url = self.endpoint("upload-excel", &[])?;
        info!(%url, file = %file_name, "uploading sheet");
        let res = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .context("failed to send upload")?;

        let status = res.status();
        let body = res.text().await.context("failed to read upload response")?;
        // The backend reports validation failures as `{"error": "..."}`.
        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(body);
            warn!(%status, %message, "upload rejected");
            return Err(anyhow!("upload failed {}: {}", status, message));
        }
        let parsed: UploadResponse =
            serde_json::from_str(&body).context("invalid upload response JSON")?;
        info!(
            updated = parsed.updated_count,
            total = parsed.total_records,
            errors = parsed.errors.len(),
            "upload processed"
        );
        Ok(parsed)
    }

    #[instrument(skip_all)]
    async fn parent_login(&self, phone: &str, password: &str) -> Result<AuthResponse> {
        let phone = phone::normalize(phone);
        self.post_auth("auth/login", &json!({ "phone_number": phone, "password": password }))
            .await
    }

    #[instrument(skip_all)]
    async fn reset_password(&self, phone: &str, new_password: &str) -> Result<AuthResponse> {
        let phone = phone::normalize(phone);
        self.post_auth(
            "auth/reset-password",
            &json!({ "phone_number": phone, "new_password": new_password }),
        )
        .await
    }

    #[instrument(skip_all)]
    async fn change_password(&self, phone: &str, current: &str, new_password: &str) -> Result<AuthResponse> {
        let phone = phone::normalize(phone);
        self.post_auth(
            "auth/change-password",
            &json!({
                "phone_number": phone,
                "current_password": current,
                "new_password": new_password,
            }),
        )
        .await
    }

    #[instrument(skip_all, fields(username = %username))]
    async fn admin_login(&self, username: &str, password: &str) -> Result<AuthResponse> {
        self.post_auth("admin/login", &json!({ "username": username, "password": password }))
            .await
    }

    #[instrument(skip_all, fields(username = %username))]
    async fn admin_change_password(
        &self,
        username: &str,
        current: &str,
        new_password: &str,
    ) -> Result<AuthResponse> {
        self.post_auth(
            "admin/change-password",
            &json!({
                "username": username,
                "current_password": current,
                "new_password": new_password,
            }),
        )
        .await
    }
}

fn content_type(file_name: &str) -> &'static str {
    if file_name.to_ascii_lowercase().ends_with(".xls") {
        "application/vnd.ms-excel"
    } else {
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    }
}
