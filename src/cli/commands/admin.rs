use clap::Args;
use serde_json::json;
use std::sync::Arc;

use crate::app::session_issuer;
use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::{DatabaseManager, PgCredentialStore, PgRecordStore};
use crate::services::invitation::{normalize_email, validate_password};
use crate::services::{AccountProvisioner, NewAccount, ServiceError};
use crate::types::Role;

#[derive(Args, Debug)]
pub struct BootstrapArgs {
    #[arg(long, help = "Admin email address")]
    pub email: String,

    #[arg(long, help = "Display name")]
    pub name: String,

    #[arg(long, env = "UPKEEP_ADMIN_PASSWORD", help = "Password (or set UPKEEP_ADMIN_PASSWORD)")]
    pub password: String,
}

pub async fn handle(
    config: &AppConfig,
    args: BootstrapArgs,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let email = normalize_email(&args.email)?;
    validate_password(&args.password)?;
    let name = args.name.trim().to_string();
    if name.is_empty() {
        anyhow::bail!("--name cannot be empty");
    }

    let db = DatabaseManager::connect(&config.database).await?;
    let sessions = session_issuer(config)?;
    let accounts = AccountProvisioner::new(
        Arc::new(PgCredentialStore::new(db.pool(), sessions)),
        Arc::new(PgRecordStore::new(db.pool())),
        config.call_timeout(),
    );

    let result = accounts
        .provision(NewAccount {
            email,
            password: args.password,
            name,
            role: Role::Admin,
            permissions: Role::Admin.default_permissions(),
            invited_by: None,
        })
        .await;
    db.close().await;

    match result {
        Ok(profile) => output_success(
            &output_format,
            &format!("Created admin account {}", profile.email),
            Some(json!({ "id": profile.id, "email": profile.email, "role": profile.role })),
        ),
        Err(e @ ServiceError::Conflict(_)) => {
            output_error(&output_format, &e.to_string(), Some("DUPLICATE_USER"));
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}
