//! Append-only billing audit trail.
//!
//! Entries are written in the same transaction as the mutation they describe
//! and are never updated or deleted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuditLogId, Timestamp, ValidationError};

/// Who performed an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    Admin,
    System,
    Webhook,
}

impl ActorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorType::Admin => "admin",
            ActorType::System => "system",
            ActorType::Webhook => "webhook",
        }
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(ActorType::Admin),
            "system" => Ok(ActorType::System),
            "webhook" => Ok(ActorType::Webhook),
            other => Err(ValidationError::invalid_format(
                "actor_type",
                format!("unknown actor type '{}'", other),
            )),
        }
    }
}

/// Action tags recorded in the audit trail.
pub mod actions {
    pub const LICENSE_KEYS_GENERATED: &str = "license_key.generate";
    pub const LICENSE_KEY_CLAIMED: &str = "license_key.claim";
    pub const LICENSE_KEY_REVOKED: &str = "license_key.revoke";
    pub const TENANT_STATUS_CHANGED: &str = "tenant.status_change";
    pub const TENANT_SUBSCRIBE_INITIATED: &str = "tenant.subscribe_initiated";
    pub const ENTITLEMENT_GRANTED: &str = "entitlement.grant";
    pub const ENTITLEMENT_REVOKED: &str = "entitlement.revoke";
    pub const WEBHOOK_CHECKOUT_COMPLETED: &str = "webhook.checkout_completed";
    pub const WEBHOOK_SUBSCRIPTION_UPDATED: &str = "webhook.subscription_updated";
    pub const WEBHOOK_SUBSCRIPTION_DELETED: &str = "webhook.subscription_deleted";
    pub const WEBHOOK_PAYMENT_FAILED: &str = "webhook.payment_failed";
    pub const WEBHOOK_PAYMENT_SUCCEEDED: &str = "webhook.payment_succeeded";
}

/// Target type tags.
pub mod targets {
    pub const TENANT: &str = "tenant";
    pub const LICENSE_KEY: &str = "license_key";
    pub const ENTITLEMENT: &str = "entitlement";
    pub const SUBSCRIPTION: &str = "subscription";
}

/// Client network details captured for admin and public actions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOrigin {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingAuditLog {
    pub id: AuditLogId,
    pub actor_type: ActorType,
    pub actor_id: Option<String>,
    pub action: String,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub before_json: Option<serde_json::Value>,
    pub after_json: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: Timestamp,
}

impl BillingAuditLog {
    pub fn builder(actor_type: ActorType, action: impl Into<String>) -> BillingAuditLogBuilder {
        BillingAuditLogBuilder {
            actor_type,
            actor_id: None,
            action: action.into(),
            target_type: None,
            target_id: None,
            before_json: None,
            after_json: None,
            origin: RequestOrigin::default(),
        }
    }
}

pub struct BillingAuditLogBuilder {
    actor_type: ActorType,
    actor_id: Option<String>,
    action: String,
    target_type: Option<String>,
    target_id: Option<String>,
    before_json: Option<serde_json::Value>,
    after_json: Option<serde_json::Value>,
    origin: RequestOrigin,
}

impl BillingAuditLogBuilder {
    pub fn actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn target(mut self, target_type: &str, target_id: impl ToString) -> Self {
        self.target_type = Some(target_type.to_string());
        self.target_id = Some(target_id.to_string());
        self
    }

    pub fn before(mut self, snapshot: serde_json::Value) -> Self {
        self.before_json = Some(snapshot);
        self
    }

    pub fn after(mut self, snapshot: serde_json::Value) -> Self {
        self.after_json = Some(snapshot);
        self
    }

    pub fn origin(mut self, origin: &RequestOrigin) -> Self {
        self.origin = origin.clone();
        self
    }

    pub fn build(self, now: Timestamp) -> BillingAuditLog {
        BillingAuditLog {
            id: AuditLogId::new(),
            actor_type: self.actor_type,
            actor_id: self.actor_id,
            action: self.action,
            target_type: self.target_type,
            target_id: self.target_id,
            before_json: self.before_json,
            after_json: self.after_json,
            ip_address: self.origin.ip_address,
            user_agent: self.origin.user_agent,
            created_at: now,
        }
    }
}
