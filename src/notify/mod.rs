//! Outbound email for invitations.
//!
//! Delivery goes to a primary HTTP email API and falls back to a secondary one.
//! With no provider configured, messages are only logged.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{EmailConfig, EmailProviderConfig};
use crate::types::Role;

#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail client setup failed: {0}")]
    Setup(String),

    #[error("{channel} transport error: {message}")]
    Transport { channel: String, message: String },

    #[error("{channel} rejected message with status {status}: {body}")]
    Rejected {
        channel: String,
        status: u16,
        body: String,
    },

    #[error("all channels failed (primary: {primary}; fallback: {fallback})")]
    AllChannelsFailed {
        primary: Box<MailError>,
        fallback: Box<MailError>,
    },
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Channel name for logs
    fn channel(&self) -> &str;

    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

/// JSON-over-HTTP email API client (bearer API key)
pub struct HttpMailer {
    client: Client,
    name: String,
    endpoint: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(provider: &EmailProviderConfig, from: &str, timeout: Duration) -> Result<Self, MailError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MailError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            name: provider.name.clone(),
            endpoint: provider.endpoint.clone(),
            api_key: provider.api_key.clone(),
            from: from.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    fn channel(&self) -> &str {
        &self.name
    }

    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let message = OutboundMessage {
            from: &self.from,
            to: [&email.to],
            subject: &email.subject,
            html: &email.html,
            text: &email.text,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&message)
            .send()
            .await
            .map_err(|e| MailError::Transport {
                channel: self.name.clone(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                channel: self.name.clone(),
                status,
                body,
            });
        }

        info!("Email '{}' sent to {} via {}", email.subject, email.to, self.name);
        Ok(())
    }
}

/// Tries `primary`, then `fallback` if the primary fails
pub struct FallbackMailer {
    primary: Arc<dyn Mailer>,
    fallback: Arc<dyn Mailer>,
}

impl FallbackMailer {
    pub fn new(primary: Arc<dyn Mailer>, fallback: Arc<dyn Mailer>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl Mailer for FallbackMailer {
    fn channel(&self) -> &str {
        self.primary.channel()
    }

    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let primary_err = match self.primary.send(email).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        warn!(
            "Primary mail channel {} failed, trying {}: {}",
            self.primary.channel(),
            self.fallback.channel(),
            primary_err
        );

        self.fallback.send(email).await.map_err(|fallback_err| {
            error!("Fallback mail channel {} failed: {}", self.fallback.channel(), fallback_err);
            MailError::AllChannelsFailed {
                primary: Box::new(primary_err),
                fallback: Box::new(fallback_err),
            }
        })
    }
}

/// Development mailer: logs instead of sending
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    fn channel(&self) -> &str {
        "log"
    }

    async fn send(&self, email: &Email) -> Result<(), MailError> {
        info!("No email provider configured; would send '{}' to {}", email.subject, email.to);
        tracing::debug!("Email body:\n{}", email.text);
        Ok(())
    }
}

/// Build the mailer chain from configuration.
pub fn from_config(config: &EmailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let build = |provider: &EmailProviderConfig| -> Result<Arc<dyn Mailer>, MailError> {
        Ok(Arc::new(HttpMailer::new(provider, &config.from_address, timeout)?))
    };

    let mailer: Arc<dyn Mailer> = match (&config.primary, &config.fallback) {
        (Some(primary), Some(fallback)) => {
            Arc::new(FallbackMailer::new(build(primary)?, build(fallback)?))
        }
        (Some(only), None) | (None, Some(only)) => build(only)?,
        (None, None) => {
            warn!("No email provider configured, invitation emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    Ok(mailer)
}

pub fn invitation_email(
    to: &str,
    inviter_name: &str,
    role: Role,
    invite_link: &str,
    expires_at: DateTime<Utc>,
) -> Email {
    let expires = expires_at.format("%B %-d, %Y");
    let role = role.as_str().to_lowercase();

    Email {
        to: to.to_string(),
        subject: format!("{} invited you to join the maintenance team", inviter_name),
        html: format!(
            "<p>{inviter_name} invited you to join as a <strong>{role}</strong>.</p>\
             <p><a href=\"{invite_link}\">Accept your invitation</a></p>\
             <p>This link expires on {expires}.</p>"
        ),
        text: format!(
            "{inviter_name} invited you to join as a {role}.\n\n\
             Accept your invitation: {invite_link}\n\n\
             This link expires on {expires}."
        ),
    }
}
