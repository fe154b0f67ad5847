use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::models::{NewProfile, UserProfile};
use crate::services::{bounded, DependencyError, ServiceError, StateConflict};
use crate::store::{CredentialStore, RecordStore, StoreError};
use crate::types::{Permission, Role, UserStatus};

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
    pub permissions: BTreeSet<Permission>,
    pub invited_by: Option<Uuid>,
}

/// Creates and destroys credential + profile pairs.
///
/// A profile never exists without its credential, and a credential created
/// here never outlives a failed profile insert.
pub struct AccountProvisioner {
    credentials: Arc<dyn CredentialStore>,
    records: Arc<dyn RecordStore>,
    call_timeout: Duration,
}

impl AccountProvisioner {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        records: Arc<dyn RecordStore>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            credentials,
            records,
            call_timeout,
        }
    }

    pub async fn provision(&self, account: NewAccount) -> Result<UserProfile, ServiceError> {
        let principal_id = match bounded(
            "create credential",
            self.call_timeout,
            self.credentials
                .create_credential(&account.email, &account.password),
        )
        .await
        {
            Ok(id) => id,
            Err(DependencyError::Store {
                source: StoreError::AlreadyExists,
                ..
            }) => {
                return Err(StateConflict::DuplicateUser {
                    email: account.email,
                }
                .into())
            }
            Err(e) => return Err(e.into()),
        };

        let profile = NewProfile {
            id: principal_id,
            email: account.email.clone(),
            name: account.name,
            role: account.role,
            permissions: account.permissions,
            status: UserStatus::Active,
            invited_by: account.invited_by,
        };

        match bounded(
            "create user profile",
            self.call_timeout,
            self.records.insert_profile(&profile),
        )
        .await
        {
            Ok(created) => {
                tracing::info!("Provisioned {} account {}", created.role, created.id);
                Ok(created)
            }
            Err(e) => {
                tracing::warn!(
                    "Profile creation for {} failed, rolling back credential {}: {}",
                    account.email,
                    principal_id,
                    e
                );
                self.discard_credential(principal_id).await;

                match e {
                    DependencyError::Store {
                        source: StoreError::AlreadyExists,
                        ..
                    } => Err(StateConflict::DuplicateUser {
                        email: account.email,
                    }
                    .into()),
                    other => Err(other.into()),
                }
            }
        }
    }

    /// Remove a provisioned account (profile first, then its credential).
    pub async fn deprovision(&self, principal_id: Uuid) {
        if let Err(e) = bounded(
            "delete user profile",
            self.call_timeout,
            self.records.delete_profile(principal_id),
        )
        .await
        {
            tracing::error!(
                "Compensation failed: profile {} could not be deleted and needs manual cleanup: {}",
                principal_id,
                e
            );
        }

        self.discard_credential(principal_id).await;
    }

    async fn discard_credential(&self, principal_id: Uuid) {
        match bounded(
            "delete credential",
            self.call_timeout,
            self.credentials.delete_credential(principal_id),
        )
        .await
        {
            Ok(()) => tracing::info!("Rolled back credential {}", principal_id),
            Err(e) => tracing::error!(
                "Compensation failed: orphaned credential {} needs manual cleanup: {}",
                principal_id,
                e
            ),
        }
    }
}
