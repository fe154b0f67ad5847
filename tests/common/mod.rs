#![allow(dead_code)]

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

use upkeep_api::app::{router, session_issuer, AppState};
use upkeep_api::auth::Principal;
use upkeep_api::config::{AppConfig, StoreBackend};
use upkeep_api::models::{InventoryItem, Invitation, NewInvitation, UserProfile};
use upkeep_api::notify::{Email, MailError, Mailer};
use upkeep_api::services::NewAccount;
use upkeep_api::store::memory::{MemoryCredentialStore, MemoryRecordStore};
use upkeep_api::store::RecordStore;
use upkeep_api::types::{Permission, Role};

pub const PASSWORD: &str = "correct-horse";

/// Captures outgoing mail; can be switched to fail every send.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Email>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    fn channel(&self) -> &str {
        "recording"
    }

    async fn send(&self, email: &Email) -> Result<(), MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::Transport {
                channel: "recording".into(),
                message: "provider unreachable".into(),
            });
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub records: Arc<MemoryRecordStore>,
    pub credentials: Arc<MemoryCredentialStore>,
    pub mailer: Arc<RecordingMailer>,
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.database.store_backend = StoreBackend::Memory;
    config.database.call_timeout_ms = 5000;
    config.security.jwt_secret = "integration-test-secret".into();
    config.invitation.frontend_url = "https://app.example.com".into();
    config
}

impl TestApp {
    pub fn new() -> Result<Self> {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Result<Self> {
        let records = Arc::new(MemoryRecordStore::new());
        let credentials = Arc::new(MemoryCredentialStore::new(session_issuer(&config)?));
        let mailer = Arc::new(RecordingMailer::default());

        let state = AppState::assemble(config, records.clone(), credentials.clone(), mailer.clone())?;

        Ok(Self {
            state,
            records,
            credentials,
            mailer,
        })
    }

    /// Provision an active account directly, bypassing invitations.
    pub async fn seed_user(
        &self,
        email: &str,
        role: Role,
        permissions: &[Permission],
    ) -> Result<(UserProfile, Principal)> {
        let profile = self
            .state
            .accounts
            .provision(NewAccount {
                email: email.to_string(),
                password: PASSWORD.to_string(),
                name: email.split('@').next().unwrap_or("user").to_string(),
                role,
                permissions: permissions.iter().copied().collect(),
                invited_by: None,
            })
            .await?;

        let principal = Principal::from_active_profile(profile.clone())
            .context("seeded profile should be active")?;
        Ok((profile, principal))
    }

    pub async fn admin(&self) -> Result<Principal> {
        Ok(self.seed_user("admin@example.com", Role::Admin, &[]).await?.1)
    }

    pub async fn manager(&self) -> Result<Principal> {
        let permissions = Role::Manager.default_permissions();
        let mut with_team: Vec<Permission> = permissions.into_iter().collect();
        with_team.push(Permission::ManageTeam);
        Ok(self
            .seed_user("manager@example.com", Role::Manager, &with_team)
            .await?
            .1)
    }

    pub async fn technician(&self) -> Result<Principal> {
        Ok(self
            .seed_user("tech@example.com", Role::Technician, &[Permission::ManageWorkOrders])
            .await?
            .1)
    }

    pub async fn login_token(&self, email: &str) -> Result<String> {
        let result = self
            .state
            .sessions
            .login(upkeep_api::services::LoginRequest {
                email: email.to_string(),
                password: PASSWORD.to_string(),
            })
            .await?;
        Ok(result.session.access_token)
    }

    pub async fn seed_item(&self, quantity: i64, min_quantity: i64) -> InventoryItem {
        let item = InventoryItem {
            id: Uuid::new_v4(),
            name: "Air filter".into(),
            sku: format!("AF-{}", &Uuid::new_v4().simple().to_string()[..6]),
            quantity,
            min_quantity,
            unit_price: Decimal::new(1299, 2),
            location: Some("Warehouse A".into()),
            category: Some("HVAC".into()),
            updated_at: Utc::now(),
        };
        self.records.seed_inventory(item.clone()).await;
        item
    }

    /// Insert an invitation with an explicit expiry, bypassing `issue`.
    pub async fn raw_invitation(
        &self,
        email: &str,
        role: Role,
        invited_by: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<Invitation> {
        let invitation = NewInvitation {
            email: email.to_string(),
            role,
            permissions: BTreeSet::new(),
            invited_by,
            token: upkeep_api::services::invitation::generate_token(),
            expires_at,
        };
        Ok(self.records.insert_invitation(&invitation).await?)
    }

    pub async fn activity_actions(&self) -> Vec<String> {
        self.records
            .activities()
            .await
            .into_iter()
            .map(|a| a.action)
            .collect()
    }

    /// Send one request through the full router and decode the JSON body.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&json)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = router(self.state.clone()).oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };

        Ok((status, json))
    }
}

/// Pull the `token` query parameter out of an invite link.
pub fn token_from_link(link: &str) -> Result<String> {
    let url = url::Url::parse(link)?;
    url.query_pairs()
        .find(|(k, _)| k == "token")
        .map(|(_, v)| v.into_owned())
        .context("invite link has no token")
}
