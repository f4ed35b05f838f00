//! Parent and admin sign-in. Credentials are checked by the backend; the
//! client only refuses requests the backend is known to reject and turns
//! `success: false` replies into errors.

use anyhow::Result;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

use crate::phone;
use crate::portal::model::AuthResponse;
use crate::portal::PortalApi;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("password must be at least {MIN_PASSWORD_LEN} characters long")]
    PasswordTooShort,
    #[error("password reset required before the dashboard can be used")]
    ResetRequired,
    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Parent,
    Admin,
}

impl Role {
    fn identifier_label(self) -> &'static str {
        match self {
            Role::Parent => "phone number",
            Role::Admin => "username",
        }
    }

    fn rejection(self) -> &'static str {
        match self {
            Role::Parent => "Invalid phone number or password",
            Role::Admin => "Invalid username or password",
        }
    }
}

/// Who is signed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub role: Role,
    /// Normalized phone for parents, username for admins.
    pub identifier: String,
    pub name: String,
    pub needs_password_reset: bool,
}

impl Account {
    /// Parents on their first login must reset the default password first.
    pub fn ensure_ready(&self) -> Result<(), AuthError> {
        if self.needs_password_reset {
            return Err(AuthError::ResetRequired);
        }
        Ok(())
    }
}

fn required(value: &str, what: &'static str) -> Result<String, AuthError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::Missing(what));
    }
    Ok(value.to_string())
}

/// Length rule the backend applies to new passwords (after trimming).
pub fn check_new_password(password: &str) -> Result<(), AuthError> {
    let password = required(password, "new password")?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::PasswordTooShort);
    }
    Ok(())
}

fn accepted(resp: AuthResponse, fallback: &str) -> Result<AuthResponse, AuthError> {
    if resp.success {
        return Ok(resp);
    }
    let message = resp
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string());
    Err(AuthError::Rejected(message))
}

#[instrument(skip_all, fields(role = ?role))]
pub async fn sign_in<A: PortalApi + ?Sized>(
    api: &A,
    role: Role,
    identifier: &str,
    password: &str,
) -> Result<Account> {
    let identifier = required(identifier, role.identifier_label())?;
    let password = required(password, "password")?;
    let resp = match role {
        Role::Parent => api.parent_login(&identifier, &password).await?,
        Role::Admin => api.admin_login(&identifier, &password).await?,
    };
    let resp = accepted(resp, role.rejection())?;

    let reset_flag = resp.needs_password_reset;
    let user = resp.user.unwrap_or_default();
    let account = match role {
        Role::Parent => Account {
            role,
            identifier: phone::normalize(user.phone_number.as_deref().unwrap_or(&identifier)),
            name: user.name,
            needs_password_reset: reset_flag || user.needs_password_reset,
        },
        Role::Admin => Account {
            role,
            identifier: user.username.unwrap_or(identifier),
            name: user.name,
            needs_password_reset: false,
        },
    };
    info!(
        identifier = %account.identifier,
        needs_password_reset = account.needs_password_reset,
        "signed in"
    );
    Ok(account)
}

/// First-login reset for a parent account.
#[instrument(skip_all)]
pub async fn reset_password<A: PortalApi + ?Sized>(api: &A, phone: &str, new_password: &str) -> Result<()> {
    let phone = required(phone, "phone number")?;
    check_new_password(new_password)?;
    let resp = api.reset_password(&phone, new_password.trim()).await?;
    accepted(resp, "Failed to update password")?;
    info!("password reset");
    Ok(())
}

#[instrument(skip_all, fields(role = ?role))]
pub async fn change_password<A: PortalApi + ?Sized>(
    api: &A,
    role: Role,
    identifier: &str,
    current: &str,
    new_password: &str,
) -> Result<()> {
    let identifier = required(identifier, role.identifier_label())?;
    let current = required(current, "current password")?;
    check_new_password(new_password)?;
    let new_password = new_password.trim();
    let resp = match role {
        Role::Parent => api.change_password(&identifier, &current, new_password).await?,
        Role::Admin => api.admin_change_password(&identifier, &current, new_password).await?,
    };
    accepted(resp, "Failed to change password")?;
    info!("password changed");
    Ok(())
}
