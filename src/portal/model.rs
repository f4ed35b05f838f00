use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize, Debug, Default)]
pub struct StudentsResp {
    #[serde(default)]
    pub students: Vec<Value>,
}

#[derive(Deserialize, Debug, Default)]
pub struct SessionsResp {
    #[serde(default)]
    pub sessions: Vec<Value>,
}

#[derive(Deserialize, Debug, Default)]
pub struct GroupsResp {
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Reply of `POST upload-excel`.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub updated_count: u64,
    #[serde(default)]
    pub total_records: u64,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct SessionNumbersResp {
    #[serde(default)]
    pub sessions: Vec<u32>,
}

/// Account fields echoed back by the login endpoints. Parents are
/// identified by phone number, admins by username.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct AuthUser {
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub needs_password_reset: bool,
}

/// Reply of every `auth/*` and `admin/*` password endpoint. Rejections
/// arrive with a 4xx status and `success: false`.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct AuthResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub needs_password_reset: bool,
    #[serde(default)]
    pub user: Option<AuthUser>,
}
