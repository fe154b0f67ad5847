use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::types::{Permission, Role};

/// Invitations stay redeemable for this long after issuance
pub const INVITATION_VALIDITY_DAYS: i64 = 7;

/// Invitation row as held by the record store.
///
/// `token` never leaves the service layer except inside the invite link.
#[derive(Debug, Clone, PartialEq)]
pub struct Invitation {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub permissions: BTreeSet<Permission>,
    pub invited_by: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn summary(&self) -> InvitationSummary {
        InvitationSummary {
            id: self.id,
            email: self.email.clone(),
            role: self.role,
            expires_at: self.expires_at,
        }
    }
}

/// Public-safe projection returned to inviters
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationSummary {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub email: String,
    pub role: Role,
    pub permissions: BTreeSet<Permission>,
    pub invited_by: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl NewInvitation {
    pub fn new(
        email: String,
        role: Role,
        permissions: BTreeSet<Permission>,
        invited_by: Uuid,
        token: String,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            email,
            role,
            permissions,
            invited_by,
            token,
            expires_at: issued_at + Duration::days(INVITATION_VALIDITY_DAYS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_seven_days_after_issuance() {
        let issued = Utc::now();
        let invite = NewInvitation::new(
            "a@example.com".into(),
            Role::Technician,
            BTreeSet::new(),
            Uuid::new_v4(),
            "t".into(),
            issued,
        );
        assert_eq!(invite.expires_at - issued, Duration::days(7));
    }
}
