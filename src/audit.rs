/// Audit trail for authentication events
///
/// Login, refresh and logout outcomes are emitted as structured events on
/// the `audit` tracing target so they can be routed separately from
/// ordinary application logs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Register,
    Login,
    Refresh,
    Logout,
    ChangePassword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditOutcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditLog {
    pub audit_id: String,
    pub action: AuditAction,
    pub outcome: AuditOutcome,
    pub user_id: Option<String>,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditLog {
    pub fn new(action: AuditAction, outcome: AuditOutcome, details: impl Into<String>) -> Self {
        Self {
            audit_id: Uuid::new_v4().to_string(),
            action,
            outcome,
            user_id: None,
            details: details.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn success(action: AuditAction, user_id: Uuid) -> Self {
        Self::new(action, AuditOutcome::Success, "").with_user_id(user_id)
    }

    pub fn failure(action: AuditAction, details: impl Into<String>) -> Self {
        Self::new(action, AuditOutcome::Failure, details)
    }

    pub fn with_user_id(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn emit(&self) {
        let entry = serde_json::to_string(self).unwrap_or_default();
        match self.outcome {
            AuditOutcome::Success => {
                tracing::info!(target: "audit", action = ?self.action, entry = %entry, "audit")
            }
            AuditOutcome::Failure => {
                tracing::warn!(target: "audit", action = ?self.action, entry = %entry, "audit")
            }
        }
    }
}
