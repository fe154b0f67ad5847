use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::SessionIssuer;
use crate::database::records::store_error;
use crate::models::Session;
use crate::store::{CredentialStore, StoreError};

/// Credentials table plus JWT session issuance
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
    sessions: SessionIssuer,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool, sessions: SessionIssuer) -> Self {
        Self { pool, sessions }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn verify_token(&self, token: &str) -> Result<Option<Uuid>, StoreError> {
        let claims = match self.sessions.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!("Rejected bearer token: {}", e);
                return Ok(None);
            }
        };

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM credentials WHERE id = $1)")
            .bind(claims.sub)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(exists.then_some(claims.sub))
    }

    async fn create_credential(&self, email: &str, password: &str) -> Result<Uuid, StoreError> {
        let password_hash = hash_password(password).await?;

        sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO credentials (id, email, password_hash) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)
    }

    async fn delete_credential(&self, principal_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM credentials WHERE id = $1")
            .bind(principal_id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Option<Session>, StoreError> {
        let row: Option<(Uuid, String, String)> = sqlx::query_as(
            "SELECT id, email, password_hash FROM credentials WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        let Some((id, email, password_hash)) = row else {
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
