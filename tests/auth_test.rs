use anyhow::{anyhow, Result};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

use tutor_portal::auth::{self, AuthError, Role};
use tutor_portal::portal::model::{AuthResponse, AuthUser, UploadResponse};
use tutor_portal::portal::PortalApi;
use tutor_portal::upload::UploadRequest;

/// Backend with one parent and one admin account. Passwords are compared
/// verbatim and every auth call is recorded as `endpoint:identifier`.
#[derive(Clone)]
struct AccountsPortal {
    parent_phone: String,
    parent_password: Arc<Mutex<String>>,
    needs_reset: Arc<Mutex<bool>>,
    admin_password: String,
    calls: Arc<Mutex<Vec<String>>>,
}

impl AccountsPortal {
    fn new() -> Self {
        Self {
            parent_phone: "01012345678".into(),
            parent_password: Arc::new(Mutex::new("123456".into())),
            needs_reset: Arc::new(Mutex::new(true)),
            admin_password: "admin123".into(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    async fn record(&self, call: String) {
        self.calls.lock().await.push(call);
    }

    async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

fn rejected(message: &str) -> AuthResponse {
    AuthResponse {
        success: false,
        message: Some(message.into()),
        ..Default::default()
    }
}

fn ok(message: &str) -> AuthResponse {
    AuthResponse {
        success: true,
        message: Some(message.into()),
        ..Default::default()
    }
}

#[async_trait::async_trait]
impl PortalApi for AccountsPortal {
    async fn parent_students(&self, _phone: &str) -> Result<Vec<Value>> {
        Ok(Vec::new())
    }

    async fn parent_sessions(&self, _phone: &str, _student_id: Option<&str>) -> Result<Vec<Value>> {
        Ok(Vec::new())
    }

    async fn all_students(&self) -> Result<Vec<Value>> {
        Ok(Vec::new())
    }

    async fn groups(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn session_numbers(&self) -> Result<Vec<u32>> {
        Ok(Vec::new())
    }

    async fn upload_excel(&self, _req: &UploadRequest) -> Result<UploadResponse> {
        Err(anyhow!("not used"))
    }

    async fn parent_login(&self, phone: &str, password: &str) -> Result<AuthResponse> {
        self.record(format!("login:{phone}")).await;
        if phone != self.parent_phone || *self.parent_password.lock().await != password {
            return Ok(rejected("Invalid phone number or password"));
        }
        let needs_reset = *self.needs_reset.lock().await;
        Ok(AuthResponse {
            success: true,
            message: None,
            needs_password_reset: needs_reset,
            user: Some(AuthUser {
                phone_number: Some(self.parent_phone.clone()),
                name: format!("Parent {}", self.parent_phone),
                needs_password_reset: needs_reset,
                ..Default::default()
            }),
        })
    }

    async fn reset_password(&self, phone: &str, new_password: &str) -> Result<AuthResponse> {
        self.record(format!("reset:{phone}")).await;
        if phone != self.parent_phone {
            return Ok(rejected("Parent not found"));
        }
        *self.parent_password.lock().await = new_password.to_string();
        *self.needs_reset.lock().await = false;
        Ok(ok("Password updated successfully"))
    }

    async fn change_password(&self, phone: &str, current: &str, new_password: &str) -> Result<AuthResponse> {
        self.record(format!("change:{phone}")).await;
        let mut stored = self.parent_password.lock().await;
        if *stored != current {
            return Ok(rejected("Current password is incorrect"));
        }
        *stored = new_password.to_string();
        Ok(ok("Password changed successfully"))
    }

    async fn admin_login(&self, username: &str, password: &str) -> Result<AuthResponse> {
        self.record(format!("admin-login:{username}")).await;
        if username != "admin" || password != self.admin_password {
            // Older backends send no message with the rejection.
            return Ok(AuthResponse::default());
        }
        Ok(AuthResponse {
            success: true,
            user: Some(AuthUser {
                username: Some("admin".into()),
                name: "Admin User".into(),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    async fn admin_change_password(
        &self,
        username: &str,
        _current: &str,
        _new_password: &str,
    ) -> Result<AuthResponse> {
        self.record(format!("admin-change:{username}")).await;
        Ok(ok("Password changed successfully"))
    }
}

#[tokio::test]
async fn first_login_requires_reset_then_succeeds() {
    let portal = AccountsPortal::new();

    let account = auth::sign_in(&portal, Role::Parent, "01012345678", "123456").await.unwrap();
    assert_eq!(account.identifier, "01012345678");
    assert_eq!(account.name, "Parent 01012345678");
    assert!(account.needs_password_reset);
    assert_eq!(account.ensure_ready(), Err(AuthError::ResetRequired));

    auth::reset_password(&portal, "01012345678", "  s3cret-pw ").await.unwrap();

    let account = auth::sign_in(&portal, Role::Parent, "01012345678", "s3cret-pw").await.unwrap();
    assert!(!account.needs_password_reset);
    assert_eq!(account.ensure_ready(), Ok(()));
}

#[tokio::test]
async fn wrong_password_is_rejected_with_backend_message() {
    let portal = AccountsPortal::new();
    let err = auth::sign_in(&portal, Role::Parent, "01012345678", "nope").await.unwrap_err();
    assert_eq!(
        err.downcast_ref::<AuthError>(),
        Some(&AuthError::Rejected("Invalid phone number or password".into()))
    );
}

#[tokio::test]
async fn blank_credentials_never_reach_backend() {
    let portal = AccountsPortal::new();
    let err = auth::sign_in(&portal, Role::Parent, "   ", "123456").await.unwrap_err();
    assert_eq!(err.downcast_ref::<AuthError>(), Some(&AuthError::Missing("phone number")));
    let err = auth::sign_in(&portal, Role::Admin, "admin", "").await.unwrap_err();
    assert_eq!(err.downcast_ref::<AuthError>(), Some(&AuthError::Missing("password")));
    assert!(portal.calls().await.is_empty());
}

#[tokio::test]
async fn short_new_password_never_reaches_backend() {
    let portal = AccountsPortal::new();
    let err = auth::reset_password(&portal, "01012345678", "12345").await.unwrap_err();
    assert_eq!(err.downcast_ref::<AuthError>(), Some(&AuthError::PasswordTooShort));
    let err = auth::change_password(&portal, Role::Admin, "admin", "admin123", "abc")
        .await
        .unwrap_err();
    assert_eq!(err.downcast_ref::<AuthError>(), Some(&AuthError::PasswordTooShort));
    assert!(portal.calls().await.is_empty());
}

#[tokio::test]
async fn change_password_checks_current() {
    let portal = AccountsPortal::new();
    let err = auth::change_password(&portal, Role::Parent, "01012345678", "wrong", "newpass1")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Current password is incorrect");

    auth::change_password(&portal, Role::Parent, "01012345678", "123456", "newpass1")
        .await
        .unwrap();
    assert!(auth::sign_in(&portal, Role::Parent, "01012345678", "newpass1").await.is_ok());
}

#[tokio::test]
async fn admin_login_and_default_rejection() {
    let portal = AccountsPortal::new();
    let account = auth::sign_in(&portal, Role::Admin, " admin ", "admin123").await.unwrap();
    assert_eq!(account.role, Role::Admin);
    assert_eq!(account.identifier, "admin");
    assert_eq!(account.name, "Admin User");
    assert!(account.ensure_ready().is_ok());

    let err = auth::sign_in(&portal, Role::Admin, "admin", "guess").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid username or password");

    auth::change_password(&portal, Role::Admin, "admin", "admin123", "longer-pw")
        .await
        .unwrap();
    assert_eq!(
        portal.calls().await,
        vec!["admin-login:admin", "admin-login:admin", "admin-change:admin"]
    );
}
