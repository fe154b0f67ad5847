//! Raw table rows and their conversion into domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::models::{ActivityLog, InventoryItem, Invitation, UserProfile};
use crate::store::StoreError;
use crate::types::{Permission, Role, UserStatus};

pub const PROFILE_COLUMNS: &str =
    "id, email, name, role, permissions, status, invited_by, created_at";

pub const INVITATION_COLUMNS: &str =
    "id, email, role, permissions, invited_by, token, expires_at, used, created_at";

pub const INVENTORY_COLUMNS: &str =
    "id, name, sku, quantity, min_quantity, unit_price, location, category, updated_at";

pub const ACTIVITY_COLUMNS: &str =
    "id, user_id, action, entity_type, entity_id, details, created_at";

#[derive(Debug, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    pub permissions: Vec<String>,
    pub status: String,
    pub invited_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct InvitationRow {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub permissions: Vec<String>,
    pub invited_by: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct InventoryRow {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub quantity: i64,
    pub min_quantity: i64,
    pub unit_price: Decimal,
    pub location: Option<String>,
    pub category: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct ActivityRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

fn invalid(e: impl std::fmt::Display) -> StoreError {
    StoreError::InvalidRow(e.to_string())
}

fn permissions(values: &[String]) -> Result<BTreeSet<Permission>, StoreError> {
    Permission::parse_set(values).map_err(invalid)
}

pub fn permission_names(set: &BTreeSet<Permission>) -> Vec<String> {
    set.iter().map(|p| p.as_str().to_string()).collect()
}

impl TryFrom<ProfileRow> for UserProfile {
    type Error = StoreError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(UserProfile {
            role: row.role.parse::<Role>().map_err(invalid)?,
            permissions: permissions(&row.permissions)?,
            status: row.status.parse::<UserStatus>().map_err(invalid)?,
            id: row.id,
            email: row.email,
            name: row.name,
            invited_by: row.invited_by,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<InvitationRow> for Invitation {
    type Error = StoreError;

    fn try_from(row: InvitationRow) -> Result<Self, Self::Error> {
        Ok(Invitation {
            role: row.role.parse::<Role>().map_err(invalid)?,
            permissions: permissions(&row.permissions)?,
            id: row.id,
            email: row.email,
            invited_by: row.invited_by,
            token: row.token,
            expires_at: row.expires_at,
            used: row.used,
            created_at: row.created_at,
        })
    }
}

impl From<InventoryRow> for InventoryItem {
    fn from(row: InventoryRow) -> Self {
        InventoryItem {
            id: row.id,
            name: row.name,
            sku: row.sku,
            quantity: row.quantity,
            min_quantity: row.min_quantity,
            unit_price: row.unit_price,
            location: row.location,
            category: row.category,
            updated_at: row.updated_at,
        }
    }
}

impl From<ActivityRow> for ActivityLog {
    fn from(row: ActivityRow) -> Self {
        ActivityLog {
            id: row.id,
            user_id: row.user_id,
            action: row.action,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            details: row.details,
            created_at: row.created_at,
        }
    }
}
