use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppError;

/// Tenant (company) identifier; every role row and membership is scoped by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Creates a random tenant identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a tenant identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TenantId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Opaque user identifier issued by the external session store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a random user identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a user identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for UserId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Coarse access level of a user inside one tenant.
///
/// The tier is supplied by the session store and is never derived from role
/// configuration. Both admin tiers bypass role configuration entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Platform operator.
    SuperAdmin,
    /// Administrator of one company.
    #[serde(rename = "company_admin")]
    TenantAdmin,
    /// Regular member whose access comes from the assigned role.
    #[serde(rename = "employee")]
    StandardMember,
}

impl Tier {
    /// Returns the stable transport value for this tier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::TenantAdmin => "company_admin",
            Self::StandardMember => "employee",
        }
    }

    /// Returns whether this tier is granted everything without consulting roles.
    #[must_use]
    pub fn bypasses_role_configuration(&self) -> bool {
        matches!(self, Self::SuperAdmin | Self::TenantAdmin)
    }

    /// Display label used as the resolved role name for admin tiers.
    #[must_use]
    pub fn display_label(&self) -> Option<&'static str> {
        match self {
            Self::SuperAdmin => Some("Super Admin"),
            Self::TenantAdmin => Some("Admin"),
            Self::StandardMember => None,
        }
    }
}

impl FromStr for Tier {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "super_admin" => Ok(Self::SuperAdmin),
            "company_admin" => Ok(Self::TenantAdmin),
            "employee" => Ok(Self::StandardMember),
            _ => Err(AppError::Validation(format!("unknown tier value '{value}'"))),
        }
    }
}

impl Display for Tier {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Point-in-time view of the session collaborator.
///
/// Any of the fields may be absent while the session is still loading or
/// after sign-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Authenticated user, if any.
    pub user_id: Option<UserId>,
    /// Active tenant (company), if any.
    pub tenant_id: Option<TenantId>,
    /// Tier of the user inside the active tenant.
    pub tier: Option<Tier>,
}

impl SessionSnapshot {
    /// Creates a snapshot for an authenticated user inside a tenant.
    #[must_use]
    pub fn authenticated(user_id: UserId, tenant_id: TenantId, tier: Tier) -> Self {
        Self {
            user_id: Some(user_id),
            tenant_id: Some(tenant_id),
            tier: Some(tier),
        }
    }

    /// Creates a snapshot without any authenticated user.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Returns the `(user, tenant)` pair when both are present.
    #[must_use]
    pub fn context(&self) -> Option<(UserId, TenantId)> {
        Some((self.user_id?, self.tenant_id?))
    }
}
