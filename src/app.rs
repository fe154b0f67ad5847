use anyhow::Context;
use axum::{
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::audit::AuditLogger;
use crate::auth::{AuthGuard, SessionIssuer};
use crate::config::{AppConfig, StoreBackend};
use crate::database::{DatabaseManager, PgCredentialStore, PgRecordStore};
use crate::handlers::{protected, public};
use crate::middleware::require_principal;
use crate::notify::{self, Mailer};
use crate::services::{
    bounded, AccountProvisioner, InventoryService, InvitationService, InvitationSettings,
    SessionService,
};
use crate::store::memory::{MemoryCredentialStore, MemoryRecordStore};
use crate::store::{CredentialStore, RecordStore};

/// Everything a handler can reach, cloned per request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub guard: Arc<AuthGuard>,
    pub invitations: Arc<InvitationService>,
    pub sessions: Arc<SessionService>,
    pub inventory: Arc<InventoryService>,
    pub accounts: Arc<AccountProvisioner>,
    pub records: Arc<dyn RecordStore>,
}

impl AppState {
    /// Wire the services over already-constructed stores and mailer.
    pub fn assemble(
        config: AppConfig,
        records: Arc<dyn RecordStore>,
        credentials: Arc<dyn CredentialStore>,
        mailer: Arc<dyn Mailer>,
    ) -> anyhow::Result<Self> {
        let call_timeout = config.call_timeout();
        let mail_timeout = Duration::from_secs(config.email.timeout_secs);

        let settings =
            InvitationSettings::new(&config.invitation.frontend_url, call_timeout, mail_timeout)
                .context("FRONTEND_URL is not a valid URL")?;

        let audit = AuditLogger::new(
            records.clone(),
            call_timeout,
            config.security.enable_audit_logging,
        );
        let accounts = Arc::new(AccountProvisioner::new(
            credentials.clone(),
            records.clone(),
            call_timeout,
        ));

        Ok(Self {
            guard: Arc::new(AuthGuard::new(credentials.clone(), records.clone(), call_timeout)),
            invitations: Arc::new(InvitationService::new(
                records.clone(),
                credentials.clone(),
                accounts.clone(),
                mailer,
                audit.clone(),
                settings,
            )),
            sessions: Arc::new(SessionService::new(credentials, records.clone(), call_timeout)),
            inventory: Arc::new(InventoryService::new(records.clone(), audit, call_timeout)),
            accounts,
            records,
            config: Arc::new(config),
        })
    }
}

pub fn session_issuer(config: &AppConfig) -> anyhow::Result<SessionIssuer> {
    SessionIssuer::new(&config.security.jwt_secret, config.security.jwt_expiry_hours)
        .context("invalid JWT configuration")
}

/// Connect the configured store backend and assemble the application state.
pub async fn build_state(config: AppConfig) -> anyhow::Result<AppState> {
    let sessions = session_issuer(&config)?;
    let mailer = notify::from_config(&config.email).context("failed to build mailer")?;

    let (records, credentials): (Arc<dyn RecordStore>, Arc<dyn CredentialStore>) =
        match config.database.store_backend {
            StoreBackend::Postgres => {
                let db = DatabaseManager::connect(&config.database)
                    .await
                    .context("failed to connect to database")?;
                (
                    Arc::new(PgRecordStore::new(db.pool())),
                    Arc::new(PgCredentialStore::new(db.pool(), sessions)),
                )
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store; all data is lost on restart");
                (
                    Arc::new(MemoryRecordStore::new()),
                    Arc::new(MemoryCredentialStore::new(sessions)),
                )
            }
        };

    AppState::assemble(config, records, credentials, mailer)
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/invite", post(protected::auth::invite_post))
        .route("/auth/invitations", get(protected::auth::invitations_get))
        .route("/auth/me", get(protected::auth::me_get))
        .route("/inventory/consume", post(protected::inventory::consume_post))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_principal));

    let public = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/login", post(public::auth::login_post))
        .route("/auth/verify-invitation", get(public::auth::verify_invitation_get))
        .route("/auth/signup", post(public::auth::signup_post));

    let request_timeout = Duration::from_secs(state.config.server.request_timeout_secs);
    let cors = cors_layer(&state.config.security.cors_origins);

    public
        .merge(protected)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(allowed))
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Upkeep API",
            "version": version,
            "description": "Maintenance management backend: team invitations and inventory",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "public_auth": "/auth/login, /auth/verify-invitation, /auth/signup (public)",
                "team": "/auth/invite, /auth/invitations, /auth/me (protected)",
                "inventory": "/inventory/consume (protected)",
            }
        }
    }))
}

async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match bounded("health check", state.config.call_timeout(), state.records.ping()).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": true,
                    "message": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
