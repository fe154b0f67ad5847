//! Invitation lifecycle: issue → verify → redeem.
//!
//! Redemption provisions the account first and then claims the invitation
//! with a single conditional update. Losing the claim undoes the account, so a
//! provisioned account always corresponds to exactly one used invitation.

use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::audit::{AuditAction, AuditLogger};
use crate::auth::Principal;
use crate::models::{Invitation, InvitationSummary, NewInvitation, Session, UserProfile};
use crate::notify::{invitation_email, Mailer};
use crate::services::{bounded, AccountProvisioner, NewAccount, ServiceError, StateConflict};
use crate::store::{CredentialStore, RecordStore};
use crate::types::{Permission, Role};

pub const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_NAME_LENGTH: usize = 100;
const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone)]
pub struct InvitationSettings {
    signup_url: Url,
    pub call_timeout: Duration,
    pub mail_timeout: Duration,
}

impl InvitationSettings {
    /// `frontend_url` is the base the `signup` page hangs off.
    pub fn new(
        frontend_url: &str,
        call_timeout: Duration,
        mail_timeout: Duration,
    ) -> Result<Self, url::ParseError> {
        let mut base = Url::parse(frontend_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            signup_url: base.join("signup")?,
            call_timeout,
            mail_timeout,
        })
    }

    pub fn invite_link(&self, token: &str) -> String {
        let mut link = self.signup_url.clone();
        link.query_pairs_mut().append_pair("token", token);
        link.into()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InviteRequest {
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedInvitation {
    pub invitation: InvitationSummary,
    pub invite_link: String,
    pub email_delivered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifiedInvitation {
    pub email: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub token: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupResult {
    pub user: UserProfile,
    pub session: Option<Session>,
}

pub struct InvitationService {
    records: Arc<dyn RecordStore>,
    credentials: Arc<dyn CredentialStore>,
    accounts: Arc<AccountProvisioner>,
    mailer: Arc<dyn Mailer>,
    audit: AuditLogger,
    settings: InvitationSettings,
}

impl InvitationService {
    pub fn new(
        records: Arc<dyn RecordStore>,
        credentials: Arc<dyn CredentialStore>,
        accounts: Arc<AccountProvisioner>,
        mailer: Arc<dyn Mailer>,
        audit: AuditLogger,
        settings: InvitationSettings,
    ) -> Self {
        Self {
            records,
            credentials,
            accounts,
            mailer,
            audit,
            settings,
        }
    }

    pub async fn issue(
        &self,
        inviter: &Principal,
        request: InviteRequest,
    ) -> Result<IssuedInvitation, ServiceError> {
        inviter.require(Permission::ManageTeam)?;

        let role = request
            .role
            .parse::<Role>()
            .map_err(|e| ServiceError::invalid_field("role", e.to_string()))?;

        let email = normalize_email(&request.email)?;

        if role == Role::Admin && !inviter.is_admin() {
            tracing::warn!(
                "Blocked admin invitation for {} by non-admin {} ({})",
                email,
                inviter.id,
                inviter.role
            );
            self.audit
                .record(
                    Some(inviter.id),
                    AuditAction::BlockedAdminInvitation,
                    None,
                    json!({ "email": email, "inviterRole": inviter.role }),
                )
                .await;
            return Err(ServiceError::Forbidden(
                "Only administrators can invite administrators".into(),
            ));
        }

        let permissions = match request.permissions {
            Some(list) => Permission::parse_set(list)
                .map_err(|e| ServiceError::invalid_field("permissions", e.to_string()))?,
            None => role.default_permissions(),
        };

        let existing = bounded(
            "look up user by email",
            self.settings.call_timeout,
            self.records.find_profile_by_email(&email),
        )
        .await?;
        if existing.is_some() {
            return Err(StateConflict::DuplicateUser { email }.into());
        }

        let new_invitation = NewInvitation::new(
            email,
            role,
            permissions,
            inviter.id,
            generate_token(),
            Utc::now(),
        );
        let invitation = bounded(
            "create invitation",
            self.settings.call_timeout,
            self.records.insert_invitation(&new_invitation),
        )
        .await?;

        tracing::info!(
            "Invitation {} issued for {} as {} by {}",
            invitation.id,
            invitation.email,
            invitation.role,
            inviter.id
        );

        self.audit
            .record(
                Some(inviter.id),
                AuditAction::InvitedUser,
                Some(invitation.id),
                json!({
                    "email": invitation.email,
                    "role": invitation.role,
                    "permissions": invitation.permissions,
                }),
            )
            .await;

        let invite_link = self.settings.invite_link(&invitation.token);
        let email_delivered = self.deliver(inviter, &invitation, &invite_link).await;

        Ok(IssuedInvitation {
            invitation: invitation.summary(),
            invite_link,
            email_delivered,
        })
    }

    /// Read-only check that `token` can still be redeemed.
    pub async fn verify(&self, token: &str) -> Result<VerifiedInvitation, ServiceError> {
        let invitation = self.load_redeemable(token, Utc::now()).await?;

        Ok(VerifiedInvitation {
            email: invitation.email,
            role: invitation.role,
            expires_at: invitation.expires_at,
        })
    }

    pub async fn redeem(&self, request: SignupRequest) -> Result<SignupResult, ServiceError> {
        let name = validate_name(&request.name)?;
        validate_password(&request.password)?;

        let invitation = self.load_redeemable(&request.token, Utc::now()).await?;

        let provisioned = self
            .accounts
            .provision(NewAccount {
                email: invitation.email.clone(),
                password: request.password.clone(),
                name,
                role: invitation.role,
                permissions: invitation.permissions.clone(),
                invited_by: Some(invitation.invited_by),
            })
            .await;

        let user = match provisioned {
            Ok(user) => user,
            Err(ServiceError::Conflict(StateConflict::DuplicateUser { email })) => {
                // A concurrent redemption of this same invitation got there first
                if self.is_claimed(&invitation.token).await {
                    return Err(StateConflict::AlreadyUsed.into());
                }
                return Err(StateConflict::DuplicateUser { email }.into());
            }
            Err(e) => return Err(e),
        };

        let claimed = bounded(
            "claim invitation",
            self.settings.call_timeout,
            self.records.claim_invitation(&invitation.token, Utc::now()),
        )
        .await;

        match claimed {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::warn!(
                    "Invitation {} was claimed concurrently or expired; undoing account {}",
                    invitation.id,
                    user.id
                );
                self.accounts.deprovision(user.id).await;
                return Err(self.classify_lost_claim(&invitation.token).await);
            }
            // The update may have committed before the error surfaced
            Err(e) => match self.claim_state(&invitation.token).await {
                Some(true) => {
                    tracing::warn!(
                        "Claim of invitation {} reported '{}' but the invitation is used; keeping account {}",
                        invitation.id,
                        e,
                        user.id
                    );
                }
                Some(false) => {
                    tracing::error!(
                        "Claiming invitation {} failed; undoing account {}: {}",
                        invitation.id,
                        user.id,
                        e
                    );
                    self.accounts.deprovision(user.id).await;
                    return Err(e.into());
                }
                None => {
                    tracing::error!(
                        "Claim outcome of invitation {} is unknown after '{}'; undoing account {}. \
                         If the invitation is marked used it must be reset by hand",
                        invitation.id,
                        e,
                        user.id
                    );
                    self.accounts.deprovision(user.id).await;
                    return Err(e.into());
                }
            },
        }

        let session = self.sign_in_after_signup(&user, &request.password).await;

        self.audit
            .record(
                Some(user.id),
                AuditAction::SignedUp,
                Some(user.id),
                json!({
                    "invitationId": invitation.id,
                    "invitedBy": invitation.invited_by,
                    "role": user.role,
                }),
            )
            .await;

        tracing::info!("Invitation {} redeemed by user {}", invitation.id, user.id);
        Ok(SignupResult { user, session })
    }

    /// Unused, unexpired invitations, newest first.
    pub async fn list_pending(
        &self,
        actor: &Principal,
    ) -> Result<Vec<InvitationSummary>, ServiceError> {
        actor.require(Permission::ManageTeam)?;

        let pending = bounded(
            "list pending invitations",
            self.settings.call_timeout,
            self.records.list_pending_invitations(Utc::now()),
        )
        .await?;

        Ok(pending.iter().map(Invitation::summary).collect())
    }

    /// Expiry is checked before `used`: an expired invitation reports Expired either way.
    async fn load_redeemable(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Invitation, ServiceError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ServiceError::invalid_field(
                "token",
                "Invitation token is required",
            ));
        }

        let invitation = bounded(
            "look up invitation",
            self.settings.call_timeout,
            self.records.find_invitation_by_token(token),
        )
        .await?
        .ok_or_else(|| ServiceError::NotFound("Invitation not found".into()))?;

        if invitation.is_expired_at(now) {
            return Err(StateConflict::Expired {
                expired_at: invitation.expires_at,
            }
            .into());
        }

        if invitation.used {
            return Err(StateConflict::AlreadyUsed.into());
        }

        Ok(invitation)
    }

    async fn classify_lost_claim(&self, token: &str) -> ServiceError {
        match self.load_redeemable(token, Utc::now()).await {
            Err(e) => e,
            Ok(_) => StateConflict::AlreadyUsed.into(),
        }
    }

    async fn is_claimed(&self, token: &str) -> bool {
        self.claim_state(token).await == Some(true)
    }

    /// Current `used` flag of the invitation, `None` if it cannot be read.
    async fn claim_state(&self, token: &str) -> Option<bool> {
        match bounded(
            "look up invitation",
            self.settings.call_timeout,
            self.records.find_invitation_by_token(token),
        )
        .await
        {
            Ok(Some(invitation)) => Some(invitation.used),
            Ok(None) => Some(false),
            Err(e) => {
                tracing::warn!("Could not re-read invitation state: {}", e);
                None
            }
        }
    }

    async fn sign_in_after_signup(&self, user: &UserProfile, password: &str) -> Option<Session> {
        match bounded(
            "sign in after signup",
            self.settings.call_timeout,
            self.credentials.sign_in(&user.email, password),
        )
        .await
        {
            Ok(Some(session)) => Some(session),
            Ok(None) => {
                tracing::warn!("Automatic sign-in for new user {} was refused", user.id);
                None
            }
            Err(e) => {
                tracing::warn!("Automatic sign-in for new user {} failed: {}", user.id, e);
                None
            }
        }
    }

    async fn deliver(&self, inviter: &Principal, invitation: &Invitation, link: &str) -> bool {
        let email = invitation_email(
            &invitation.email,
            &inviter.name,
            invitation.role,
            link,
            invitation.expires_at,
        );

        match tokio::time::timeout(self.settings.mail_timeout, self.mailer.send(&email)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::warn!("Invitation {} email not delivered: {}", invitation.id, e);
                false
            }
            Err(_) => {
                tracing::warn!(
                    "Invitation {} email timed out after {:?}",
                    invitation.id,
                    self.settings.mail_timeout
                );
                false
            }
        }
    }
}

/// 256 bits from the OS RNG as 64 lowercase hex characters
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn normalize_email(email: &str) -> Result<String, ServiceError> {
    let email = email.trim().to_lowercase();

    if email.is_empty() {
        return Err(ServiceError::invalid_field("email", "Email cannot be empty"));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2
        || parts[0].is_empty()
        || !parts[1].contains('.')
        || parts[1].starts_with('.')
        || parts[1].ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(ServiceError::invalid_field("email", "Invalid email format"));
    }

    Ok(email)
}

fn validate_name(name: &str) -> Result<String, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::invalid_field("name", "Name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ServiceError::invalid_field(
            "name",
            format!("Name must be at most {} characters", MAX_NAME_LENGTH),
        ));
    }
    Ok(name.to_string())
}

pub fn validate_password(password: &str) -> Result<(), ServiceError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ServiceError::invalid_field(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH),
        ));
    }
    Ok(())
}
