/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Coarse role of a user account or invitation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Manager,
    Technician,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Technician => "TECHNICIAN",
        }
    }

    /// Capabilities granted when an invitation does not list any explicitly
    pub fn default_permissions(&self) -> BTreeSet<Permission> {
        use Permission::*;

        match self {
            Role::Admin => Permission::ALL.iter().copied().collect(),
            Role::Manager => [ManageInventory, ManageAssets, ManageWorkOrders, ViewReports]
                .into_iter()
                .collect(),
            Role::Technician => [ManageWorkOrders].into_iter().collect(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "MANAGER" => Ok(Role::Manager),
            "TECHNICIAN" => Ok(Role::Technician),
            _ => Err(UnknownVariant::new("role", s)),
        }
    }
}

/// Named capability allowing a privileged operation independent of role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    ManageTeam,
    ManageInventory,
    ManageAssets,
    ManageWorkOrders,
    ViewReports,
}

impl Permission {
    pub const ALL: [Permission; 5] = [
        Permission::ManageTeam,
        Permission::ManageInventory,
        Permission::ManageAssets,
        Permission::ManageWorkOrders,
        Permission::ViewReports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ManageTeam => "MANAGE_TEAM",
            Permission::ManageInventory => "MANAGE_INVENTORY",
            Permission::ManageAssets => "MANAGE_ASSETS",
            Permission::ManageWorkOrders => "MANAGE_WORK_ORDERS",
            Permission::ViewReports => "VIEW_REPORTS",
        }
    }

    /// Parse a list of capability strings, failing on the first unknown one
    pub fn parse_set<I, S>(values: I) -> Result<BTreeSet<Permission>, UnknownVariant>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        values.into_iter().map(|v| v.as_ref().parse()).collect()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| UnknownVariant::new("permission", s))
    }
}

/// Account status; anything but Active is treated as unauthenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Inactive,
    Pending,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "ACTIVE",
            UserStatus::Inactive => "INACTIVE",
            UserStatus::Pending => "PENDING",
        }
    }
}

impl FromStr for UserStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(UserStatus::Active),
            "INACTIVE" => Ok(UserStatus::Inactive),
            "PENDING" => Ok(UserStatus::Pending),
            _ => Err(UnknownVariant::new("status", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
