use serde::Serialize;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::models::UserProfile;
use crate::services::ServiceError;
use crate::types::{Permission, Role, UserStatus};

/// Authenticated actor, resolved once by the guard and passed immutably to handlers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub permissions: BTreeSet<Permission>,
}

impl Principal {
    /// `None` unless the profile is Active.
    pub fn from_active_profile(profile: UserProfile) -> Option<Self> {
        if profile.status != UserStatus::Active {
            return None;
        }

        Some(Self {
            id: profile.id,
            email: profile.email,
            name: profile.name,
            role: profile.role,
            permissions: profile.permissions,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins hold every capability implicitly.
    pub fn can(&self, permission: Permission) -> bool {
        self.is_admin() || self.permissions.contains(&permission)
    }

    pub fn require(&self, permission: Permission) -> Result<(), ServiceError> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "Missing required permission {}",
                permission
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profile(role: Role, permissions: &[Permission], status: UserStatus) -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            email: "p@example.com".into(),
            name: "P".into(),
            role,
            permissions: permissions.iter().copied().collect(),
            status,
            invited_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn inactive_and_pending_profiles_are_not_principals() {
        assert!(Principal::from_active_profile(profile(Role::Admin, &[], UserStatus::Inactive)).is_none());
        assert!(Principal::from_active_profile(profile(Role::Admin, &[], UserStatus::Pending)).is_none());
        assert!(Principal::from_active_profile(profile(Role::Admin, &[], UserStatus::Active)).is_some());
    }

    #[test]
    fn admin_role_implies_capabilities() {
        let admin = Principal::from_active_profile(profile(Role::Admin, &[], UserStatus::Active)).unwrap();
        assert!(admin.can(Permission::ManageInventory));

        let tech = Principal::from_active_profile(profile(
            Role::Technician,
            &[Permission::ManageWorkOrders],
            UserStatus::Active,
        ))
        .unwrap();
        assert!(tech.can(Permission::ManageWorkOrders));
        assert!(matches!(
            tech.require(Permission::ManageTeam),
            Err(ServiceError::Forbidden(_))
        ));
    }
}
