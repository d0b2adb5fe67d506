//! Tenant administrators created by the license claim and subscribe flows.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AdminId, TenantId, Timestamp};

use super::errors::BillingError;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;
pub const MAX_DISPLAY_NAME_LEN: usize = 50;
const MAX_EMAIL_LEN: usize = 254;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    Owner,
    Manager,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminRole::Owner => "owner",
            AdminRole::Manager => "manager",
        }
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tenant administrator account.
///
/// `password_hash` is a PHC string; the plaintext never reaches this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admin {
    pub id: AdminId,
    pub tenant_id: TenantId,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub role: AdminRole,
    pub created_at: Timestamp,
}

impl Admin {
    /// Creates the owner account of a freshly provisioned tenant.
    pub fn new_owner(
        tenant_id: TenantId,
        email: &str,
        display_name: &str,
        password_hash: String,
        now: Timestamp,
    ) -> Result<Self, BillingError> {
        Ok(Self {
            id: AdminId::new(),
            tenant_id,
            email: validate_email(email)?,
            display_name: validate_display_name(display_name)?,
            password_hash,
            role: AdminRole::Owner,
            created_at: now,
        })
    }
}

/// Lowercases and checks the basic `local@domain.tld` shape.
pub fn validate_email(email: &str) -> Result<String, BillingError> {
    let email = email.trim().to_ascii_lowercase();
    let invalid = || BillingError::validation("email", "invalid email address");

    if email.is_empty() || email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(invalid());
    }
    Ok(email)
}

pub fn validate_password(password: &str) -> Result<(), BillingError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN || len > MAX_PASSWORD_LEN {
        return Err(BillingError::validation(
            "password",
            format!(
                "must be between {} and {} characters",
                MIN_PASSWORD_LEN, MAX_PASSWORD_LEN
            ),
        ));
    }
    Ok(())
}

pub fn validate_display_name(name: &str) -> Result<String, BillingError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(BillingError::validation("display_name", "cannot be empty"));
    }
    if name.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(BillingError::validation(
            "display_name",
            format!("must be at most {} characters", MAX_DISPLAY_NAME_LEN),
        ));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        assert_eq!(validate_email("  Staff@Example.COM ").unwrap(), "staff@example.com");
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for bad in ["", "no-at-sign", "@example.com", "a@b", "a@@b.com", "a b@c.com", "a@.com"] {
            assert!(validate_email(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn password_length_is_bounded() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long-enough").is_ok());
        assert!(validate_password(&"p".repeat(MAX_PASSWORD_LEN + 1)).is_err());
    }

    #[test]
    fn new_owner_has_owner_role() {
        let admin = Admin::new_owner(
            TenantId::new(),
            "owner@example.com",
            "Owner",
            "$argon2id$...".to_string(),
            Timestamp::now(),
        )
        .unwrap();
        assert_eq!(admin.role, AdminRole::Owner);
    }

    #[test]
    fn blank_display_name_is_rejected() {
        assert!(validate_display_name("   ").is_err());
    }
}
