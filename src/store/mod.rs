//! Storage seams for the services.
//!
//! The Postgres implementations live in `crate::database`; `memory` holds an
//! in-process implementation used by tests and the `memory` store backend.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    ActivityLog, ConsumeOutcome, Invitation, NewActivity, NewInvitation, NewProfile, Session,
    UserProfile,
};

/// Uniform error type for all storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("invalid row: {0}")]
    InvalidRow(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Relational record store. Every method is a single statement; no
/// cross-call transaction is assumed.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // ───────────────────────────────────── Profiles ──────────────────────────────────────

    async fn find_profile(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError>;

    async fn find_profile_by_email(&self, email: &str) -> Result<Option<UserProfile>, StoreError>;

    /// Fails with `AlreadyExists` if the id or email is taken.
    async fn insert_profile(&self, profile: &NewProfile) -> Result<UserProfile, StoreError>;

    /// Fails while invitations issued by the profile still exist.
    async fn delete_profile(&self, id: Uuid) -> Result<(), StoreError>;

    // ───────────────────────────────────── Invitations ───────────────────────────────────

    /// Fails with `AlreadyExists` on a token collision.
    async fn insert_invitation(&self, invitation: &NewInvitation) -> Result<Invitation, StoreError>;

    async fn find_invitation_by_token(&self, token: &str)
        -> Result<Option<Invitation>, StoreError>;

    /// Conditionally flips `used` to true for an unused invitation that has not
    /// expired at `now`. Returns `None` when no row matched.
    async fn claim_invitation(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Invitation>, StoreError>;

    /// Unused invitations that expire after `now`, newest first.
    async fn list_pending_invitations(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invitation>, StoreError>;

    // ───────────────────────────────────── Inventory ─────────────────────────────────────

    /// Decrement `quantity` by `amount` only if enough stock remains.
    async fn consume_inventory(&self, id: Uuid, amount: i64) -> Result<ConsumeOutcome, StoreError>;

    // ───────────────────────────────────── Activity ──────────────────────────────────────

    async fn insert_activity(&self, activity: &NewActivity) -> Result<ActivityLog, StoreError>;

    /// Cheap round trip used by `/health`.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Login credential store and bearer session issuer.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Resolve a bearer token to its principal id; `None` if invalid, expired,
    /// or the credential no longer exists.
    async fn verify_token(&self, token: &str) -> Result<Option<Uuid>, StoreError>;

    /// Fails with `AlreadyExists` if the email already has a credential.
    async fn create_credential(&self, email: &str, password: &str) -> Result<Uuid, StoreError>;

    async fn delete_credential(&self, principal_id: Uuid) -> Result<(), StoreError>;

    /// Password sign-in; `None` on unknown email or wrong password.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Option<Session>, StoreError>;
}
