use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::models::{Session, UserProfile};
use crate::services::{bounded, ServiceError};
use crate::store::{CredentialStore, RecordStore};
use crate::types::UserStatus;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub user: UserProfile,
    pub session: Session,
}

/// Password login for existing accounts
pub struct SessionService {
    credentials: Arc<dyn CredentialStore>,
    records: Arc<dyn RecordStore>,
    call_timeout: Duration,
}

impl SessionService {
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

    pub async fn login(&self, request: LoginRequest) -> Result<LoginResult, ServiceError> {
        let email = request.email.trim().to_lowercase();
        if email.is_empty() || request.password.is_empty() {
            return Err(ServiceError::Validation {
                message: "Email and password are required".into(),
                field_errors: Default::default(),
            });
        }

        let session = bounded(
            "sign in",
            self.call_timeout,
            self.credentials.sign_in(&email, &request.password),
        )
        .await?
        .ok_or_else(|| {
            tracing::warn!("Failed login attempt for {}", email);
            ServiceError::Unauthenticated("Invalid email or password".into())
        })?;

        let user = bounded(
            "load user profile",
            self.call_timeout,
            self.records.find_profile(session.user_id),
        )
        .await?
        .ok_or_else(|| {
            tracing::warn!("Credential {} signed in without a profile", session.user_id);
            ServiceError::Unauthenticated("Invalid email or password".into())
        })?;

        if user.status != UserStatus::Active {
            tracing::warn!("Login refused for {} user {}", user.status.as_str(), user.id);
            return Err(ServiceError::Unauthenticated(
                "User account is not active".into(),
            ));
        }

        tracing::info!("User {} signed in", user.id);
        Ok(LoginResult { user, session })
    }
}
