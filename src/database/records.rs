use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::rows::{
    permission_names, ActivityRow, InventoryRow, InvitationRow, ProfileRow, ACTIVITY_COLUMNS,
    INVENTORY_COLUMNS, INVITATION_COLUMNS, PROFILE_COLUMNS,
};
use crate::models::{
    ActivityLog, ConsumeOutcome, Invitation, NewActivity, NewInvitation, NewProfile, UserProfile,
};
use crate::store::{RecordStore, StoreError};

/// Maps driver errors onto the backend-neutral store error
pub(crate) fn store_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::AlreadyExists,
        _ => StoreError::Backend(e.to_string()),
    }
}

/// Postgres-backed record store
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn find_profile(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", PROFILE_COLUMNS);
        sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?
            .map(UserProfile::try_from)
            .transpose()
    }

    async fn find_profile_by_email(&self, email: &str) -> Result<Option<UserProfile>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE lower(email) = lower($1)", PROFILE_COLUMNS);
        sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?
            .map(UserProfile::try_from)
            .transpose()
    }

    async fn insert_profile(&self, profile: &NewProfile) -> Result<UserProfile, StoreError> {
        let sql = format!(
            "INSERT INTO users (id, email, name, role, permissions, status, invited_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            PROFILE_COLUMNS
        );
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(profile.id)
            .bind(&profile.email)
            .bind(&profile.name)
            .bind(profile.role.as_str())
            .bind(permission_names(&profile.permissions))
            .bind(profile.status.as_str())
            .bind(profile.invited_by)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;

        UserProfile::try_from(row)
    }

    async fn delete_profile(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn insert_invitation(&self, invitation: &NewInvitation) -> Result<Invitation, StoreError> {
        let sql = format!(
            "INSERT INTO invitations (email, role, permissions, invited_by, token, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            INVITATION_COLUMNS
        );
        let row = sqlx::query_as::<_, InvitationRow>(&sql)
            .bind(&invitation.email)
            .bind(invitation.role.as_str())
            .bind(permission_names(&invitation.permissions))
            .bind(invitation.invited_by)
            .bind(&invitation.token)
            .bind(invitation.expires_at)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;

        Invitation::try_from(row)
    }

    async fn find_invitation_by_token(
        &self,
        token: &str,
    ) -> Result<Option<Invitation>, StoreError> {
        let sql = format!("SELECT {} FROM invitations WHERE token = $1", INVITATION_COLUMNS);
        sqlx::query_as::<_, InvitationRow>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?
            .map(Invitation::try_from)
            .transpose()
    }

    async fn claim_invitation(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Invitation>, StoreError> {
        let sql = format!(
            "UPDATE invitations SET used = true \
             WHERE token = $1 AND used = false AND expires_at > $2 \
             RETURNING {}",
            INVITATION_COLUMNS
        );
        sqlx::query_as::<_, InvitationRow>(&sql)
            .bind(token)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?
            .map(Invitation::try_from)
            .transpose()
    }

    async fn list_pending_invitations(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invitation>, StoreError> {
        let sql = format!(
            "SELECT {} FROM invitations WHERE used = false AND expires_at > $1 \
             ORDER BY created_at DESC",
            INVITATION_COLUMNS
        );
        sqlx::query_as::<_, InvitationRow>(&sql)
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(Invitation::try_from)
            .collect()
    }

    async fn consume_inventory(&self, id: Uuid, amount: i64) -> Result<ConsumeOutcome, StoreError> {
        let sql = format!(
            "UPDATE inventory SET quantity = quantity - $2, updated_at = now() \
             WHERE id = $1 AND quantity >= $2 \
             RETURNING {}",
            INVENTORY_COLUMNS
        );
        let updated = sqlx::query_as::<_, InventoryRow>(&sql)
            .bind(id)
            .bind(amount)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;

        if let Some(row) = updated {
            return Ok(ConsumeOutcome::Consumed(row.into()));
        }

        // Nothing matched: either the item is gone or stock was short
        let available: Option<i64> = sqlx::query_scalar("SELECT quantity FROM inventory WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(match available {
            Some(available) => ConsumeOutcome::Insufficient { available },
            None => ConsumeOutcome::NotFound,
        })
    }

    async fn insert_activity(&self, activity: &NewActivity) -> Result<ActivityLog, StoreError> {
        let sql = format!(
            "INSERT INTO activity_logs (user_id, action, entity_type, entity_id, details) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            ACTIVITY_COLUMNS
        );
        let row = sqlx::query_as::<_, ActivityRow>(&sql)
            .bind(activity.user_id)
            .bind(&activity.action)
            .bind(&activity.entity_type)
            .bind(activity.entity_id)
            .bind(&activity.details)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(row.into())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}
