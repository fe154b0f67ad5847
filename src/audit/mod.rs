//! Best-effort activity log.
//!
//! Writes go through the record store but never fail the caller: a failed or
//! timed-out write is logged and dropped.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::models::NewActivity;
use crate::services::bounded;
use crate::store::RecordStore;

/// Categories of auditable actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    InvitedUser,
    BlockedAdminInvitation,
    SignedUp,
    ConsumedInventory,
    StockDepleted,
    LowStockWarning,
}

impl AuditAction {
    pub fn label(&self) -> &'static str {
        match self {
            AuditAction::InvitedUser => "Invited User",
            AuditAction::BlockedAdminInvitation => "Blocked Admin Invitation",
            AuditAction::SignedUp => "User Signed Up",
            AuditAction::ConsumedInventory => "Consumed Inventory",
            AuditAction::StockDepleted => "Stock Depleted",
            AuditAction::LowStockWarning => "Low Stock Warning",
        }
    }

    pub fn entity_type(&self) -> &'static str {
        match self {
            AuditAction::InvitedUser | AuditAction::BlockedAdminInvitation => "invitation",
            AuditAction::SignedUp => "user",
            AuditAction::ConsumedInventory
            | AuditAction::StockDepleted
            | AuditAction::LowStockWarning => "inventory",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone)]
pub struct AuditLogger {
    records: Arc<dyn RecordStore>,
    call_timeout: Duration,
    enabled: bool,
}

impl AuditLogger {
    pub fn new(records: Arc<dyn RecordStore>, call_timeout: Duration, enabled: bool) -> Self {
        Self {
            records,
            call_timeout,
            enabled,
        }
    }

    /// Append an entry. `actor` is `None` for system-generated entries.
    pub async fn record(
        &self,
        actor: Option<Uuid>,
        action: AuditAction,
        entity_id: Option<Uuid>,
        details: Value,
    ) {
        if !self.enabled {
            tracing::debug!("Audit logging disabled, skipping '{}'", action);
            return;
        }

        let activity = NewActivity {
            user_id: actor,
            action: action.label().to_string(),
            entity_type: action.entity_type().to_string(),
            entity_id,
            details,
        };

        match bounded(
            "write audit entry",
            self.call_timeout,
            self.records.insert_activity(&activity),
        )
        .await
        {
            Ok(entry) => tracing::debug!("Audit entry {} recorded: {}", entry.id, action),
            Err(e) => tracing::warn!("Dropped audit entry '{}': {}", action, e),
        }
    }
}
