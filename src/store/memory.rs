//! In-process stores with the same conditional-write semantics as Postgres.
//!
//! Each method takes the table lock once, so every call is atomic the way a
//! single SQL statement is. Fault switches let tests force individual writes
//! to fail.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::SessionIssuer;
use crate::models::{
    ActivityLog, ConsumeOutcome, InventoryItem, Invitation, NewActivity, NewInvitation, NewProfile,
    Session, UserProfile,
};
use crate::store::{CredentialStore, RecordStore, StoreError};
use crate::types::UserStatus;

#[derive(Default)]
struct Tables {
    profiles: HashMap<Uuid, UserProfile>,
    invitations: Vec<Invitation>,
    inventory: HashMap<Uuid, InventoryItem>,
    activity: Vec<ActivityLog>,
}

#[derive(Default)]
pub struct MemoryRecordStore {
    tables: RwLock<Tables>,
    fail_profile_inserts: AtomicBool,
    fail_invitation_claims: AtomicBool,
    fail_activity_writes: AtomicBool,
    claim_ack_delay_ms: AtomicU64,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_inventory(&self, item: InventoryItem) {
        self.tables.write().await.inventory.insert(item.id, item);
    }

    pub async fn inventory_item(&self, id: Uuid) -> Option<InventoryItem> {
        self.tables.read().await.inventory.get(&id).cloned()
    }

    pub async fn activities(&self) -> Vec<ActivityLog> {
        self.tables.read().await.activity.clone()
    }

    pub async fn invitations(&self) -> Vec<Invitation> {
        self.tables.read().await.invitations.clone()
    }

    pub async fn profile_count(&self) -> usize {
        self.tables.read().await.profiles.len()
    }

    /// Move an invitation's expiry, e.g. into the past. Returns false if no
    /// invitation has `token`.
    pub async fn set_invitation_expiry(&self, token: &str, expires_at: DateTime<Utc>) -> bool {
        let mut tables = self.tables.write().await;
        match tables.invitations.iter_mut().find(|i| i.token == token) {
            Some(invitation) => {
                invitation.expires_at = expires_at;
                true
            }
            None => false,
        }
    }

    /// Returns false if no profile has `id`.
    pub async fn set_profile_status(&self, id: Uuid, status: UserStatus) -> bool {
        match self.tables.write().await.profiles.get_mut(&id) {
            Some(profile) => {
                profile.status = status;
                true
            }
            None => false,
        }
    }

    pub fn fail_profile_inserts(&self, fail: bool) {
        self.fail_profile_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_invitation_claims(&self, fail: bool) {
        self.fail_invitation_claims.store(fail, Ordering::SeqCst);
    }

    pub fn fail_activity_writes(&self, fail: bool) {
        self.fail_activity_writes.store(fail, Ordering::SeqCst);
    }

    /// Delay the answer of every claim by `delay`, after the claim has been applied.
    pub fn delay_claim_ack(&self, delay: Duration) {
        self.claim_ack_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

fn injected(flag: &AtomicBool, what: &str) -> Result<(), StoreError> {
    if flag.load(Ordering::SeqCst) {
        Err(StoreError::Backend(format!("injected failure: {}", what)))
    } else {
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find_profile(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.tables.read().await.profiles.get(&id).cloned())
    }

    async fn find_profile_by_email(&self, email: &str) -> Result<Option<UserProfile>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .profiles
            .values()
            .find(|p| p.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert_profile(&self, profile: &NewProfile) -> Result<UserProfile, StoreError> {
        injected(&self.fail_profile_inserts, "insert profile")?;

        let mut tables = self.tables.write().await;
        let taken = tables.profiles.contains_key(&profile.id)
            || tables
                .profiles
                .values()
                .any(|p| p.email.eq_ignore_ascii_case(&profile.email));
        if taken {
            return Err(StoreError::AlreadyExists);
        }

        let created = UserProfile {
            id: profile.id,
            email: profile.email.clone(),
            name: profile.name.clone(),
            role: profile.role,
            permissions: profile.permissions.clone(),
            status: profile.status,
            invited_by: profile.invited_by,
            created_at: Utc::now(),
        };
        tables.profiles.insert(created.id, created.clone());
        Ok(created)
    }

    async fn delete_profile(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.invitations.iter().any(|i| i.invited_by == id) {
            return Err(StoreError::Backend(format!(
                "profile {} is still referenced by invitations",
                id
            )));
        }
        tables.profiles.remove(&id);
        Ok(())
    }

    async fn insert_invitation(&self, invitation: &NewInvitation) -> Result<Invitation, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.invitations.iter().any(|i| i.token == invitation.token) {
            return Err(StoreError::AlreadyExists);
        }

        let created = Invitation {
            id: Uuid::new_v4(),
            email: invitation.email.clone(),
            role: invitation.role,
            permissions: invitation.permissions.clone(),
            invited_by: invitation.invited_by,
            token: invitation.token.clone(),
            expires_at: invitation.expires_at,
            used: false,
            created_at: Utc::now(),
        };
        tables.invitations.push(created.clone());
        Ok(created)
    }

    async fn find_invitation_by_token(
        &self,
        token: &str,
    ) -> Result<Option<Invitation>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.invitations.iter().find(|i| i.token == token).cloned())
    }

    async fn claim_invitation(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Invitation>, StoreError> {
        injected(&self.fail_invitation_claims, "claim invitation")?;

        let claimed = {
            let mut tables = self.tables.write().await;
            tables
                .invitations
                .iter_mut()
                .find(|i| i.token == token && !i.used && i.expires_at > now)
                .map(|i| {
                    i.used = true;
                    i.clone()
                })
        };

        let delay = self.claim_ack_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(claimed)
    }

    async fn list_pending_invitations(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invitation>, StoreError> {
        let tables = self.tables.read().await;
        let mut pending: Vec<Invitation> = tables
            .invitations
            .iter()
            .filter(|i| !i.used && i.expires_at > now)
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(pending)
    }

    async fn consume_inventory(&self, id: Uuid, amount: i64) -> Result<ConsumeOutcome, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(item) = tables.inventory.get_mut(&id) else {
            return Ok(ConsumeOutcome::NotFound);
        };

        if item.quantity < amount {
            return Ok(ConsumeOutcome::Insufficient {
                available: item.quantity,
            });
        }

        item.quantity -= amount;
        item.updated_at = Utc::now();
        Ok(ConsumeOutcome::Consumed(item.clone()))
    }

    async fn insert_activity(&self, activity: &NewActivity) -> Result<ActivityLog, StoreError> {
        injected(&self.fail_activity_writes, "insert activity")?;

        let entry = ActivityLog {
            id: Uuid::new_v4(),
            user_id: activity.user_id,
            action: activity.action.clone(),
            entity_type: activity.entity_type.clone(),
            entity_id: activity.entity_id,
            details: activity.details.clone(),
            created_at: Utc::now(),
        };
        self.tables.write().await.activity.push(entry.clone());
        Ok(entry)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

struct StoredCredential {
    email: String,
    password_hash: String,
}

pub struct MemoryCredentialStore {
    credentials: RwLock<HashMap<Uuid, StoredCredential>>,
    sessions: SessionIssuer,
    fail_sign_in: AtomicBool,
}

impl MemoryCredentialStore {
    pub fn new(sessions: SessionIssuer) -> Self {
        Self {
            credentials: RwLock::new(HashMap::new()),
            sessions,
            fail_sign_in: AtomicBool::new(false),
        }
    }

    pub async fn credential_count(&self) -> usize {
        self.credentials.read().await.len()
    }

    pub fn fail_sign_in(&self, fail: bool) {
        self.fail_sign_in.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn verify_token(&self, token: &str) -> Result<Option<Uuid>, StoreError> {
        let claims = match self.sessions.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!("Rejected bearer token: {}", e);
                return Ok(None);
            }
        };

        let known = self.credentials.read().await.contains_key(&claims.sub);
        Ok(known.then_some(claims.sub))
    }

    async fn create_credential(&self, email: &str, password: &str) -> Result<Uuid, StoreError> {
        let password_hash = hash_password(password).await?;

        let mut credentials = self.credentials.write().await;
        if credentials
            .values()
            .any(|c| c.email.eq_ignore_ascii_case(email))
        {
            return Err(StoreError::AlreadyExists);
        }

        let id = Uuid::new_v4();
        credentials.insert(
            id,
            StoredCredential {
                email: email.to_string(),
                password_hash,
            },
        );
        Ok(id)
    }

    async fn delete_credential(&self, principal_id: Uuid) -> Result<(), StoreError> {
        self.credentials.write().await.remove(&principal_id);
        Ok(())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Option<Session>, StoreError> {
        injected(&self.fail_sign_in, "sign in")?;

        let found = {
            let credentials = self.credentials.read().await;
            credentials
                .iter()
                .find(|(_, c)| c.email.eq_ignore_ascii_case(email))
                .map(|(id, c)| (*id, c.email.clone(), c.password_hash.clone()))
        };

        let Some((id, email, password_hash)) = found else {
            return Ok(None);
        };
        if !verify_password(password, &password_hash).await {
            return Ok(None);
        }

        self.sessions
            .issue(id, &email)
            .map(Some)
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}
