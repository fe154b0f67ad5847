use std::sync::Arc;
use std::time::Duration;

use crate::auth::Principal;
use crate::services::{bounded, ServiceError};
use crate::store::{CredentialStore, RecordStore};

/// Resolves bearer tokens to active principals
pub struct AuthGuard {
    credentials: Arc<dyn CredentialStore>,
    records: Arc<dyn RecordStore>,
    call_timeout: Duration,
}

impl AuthGuard {
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

    pub async fn authenticate(&self, bearer: &str) -> Result<Principal, ServiceError> {
        let principal_id = bounded(
            "verify session token",
            self.call_timeout,
            self.credentials.verify_token(bearer),
        )
        .await?
        .ok_or_else(|| ServiceError::Unauthenticated("Invalid or expired session token".into()))?;

        let profile = bounded(
            "load user profile",
            self.call_timeout,
            self.records.find_profile(principal_id),
        )
        .await?
        .ok_or_else(|| {
            tracing::warn!("Session token for {} has no user profile", principal_id);
            ServiceError::Unauthenticated("User profile not found".into())
        })?;

        let status = profile.status;
        Principal::from_active_profile(profile).ok_or_else(|| {
            tracing::warn!(
                "Rejected session for user {} with status {}",
                principal_id,
                status.as_str()
            );
            ServiceError::Unauthenticated("User account is not active".into())
        })
    }
}
