use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use rolegate_core::{AppError, AppResult, TenantId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DetailedBitSet, LegacyBitSet};

/// Role assumed for a member without an explicit assignment.
pub const DEFAULT_ROLE_NAME: &str = "Employee";

/// Role names seeded for every tenant; these rows may be edited but not deleted.
pub const PREDEFINED_ROLE_NAMES: &[&str] = &[
    "Admin",
    "HSE Manager",
    "Line Manager",
    "Doctor",
    "Employee",
    "User",
];

/// Display order given to predefined roles and the floor for custom roles.
pub const DEFAULT_DISPLAY_ORDER: i32 = 100;

/// Tenant-unique role name. Comparison is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleName(String);

impl RoleName {
    /// Creates a validated role name; surrounding whitespace is removed.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "role name must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// The sentinel role used when a member has no assignment.
    #[must_use]
    pub fn default_role() -> Self {
        Self(DEFAULT_ROLE_NAME.to_owned())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns whether the name belongs to the predefined set.
    #[must_use]
    pub fn is_predefined_name(&self) -> bool {
        PREDEFINED_ROLE_NAMES.contains(&self.0.as_str())
    }
}

impl TryFrom<String> for RoleName {
    type Error = rolegate_core::AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoleName> for String {
    fn from(value: RoleName) -> Self {
        value.0
    }
}

impl Display for RoleName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Storage surrogate key of a role row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(Uuid);

impl RoleId {
    /// Creates a random role identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a role identifier from an existing UUID value.
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

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

/// Tenant-scoped role configuration. `(tenant_id, role_name)` is the natural key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomRole {
    /// Storage surrogate key.
    pub id: RoleId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Tenant-unique name.
    pub role_name: RoleName,
    /// Coarse per-area flags.
    pub legacy_permissions: LegacyBitSet,
    /// Fine-grained per-category flags.
    pub detailed_permissions: DetailedBitSet,
    /// Free-form description shown to administrators.
    pub description: String,
    /// Predefined roles cannot be deleted.
    pub is_predefined: bool,
    /// Position in role listings.
    pub display_order: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl CustomRole {
    /// Creates a custom role with every permission denied.
    #[must_use]
    pub fn new_custom(
        tenant_id: TenantId,
        role_name: RoleName,
        description: impl Into<String>,
        display_order: i32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RoleId::new(),
            tenant_id,
            role_name,
            legacy_permissions: LegacyBitSet::deny_all(),
            detailed_permissions: DetailedBitSet::deny_all(),
            description: description.into(),
            is_predefined: false,
            display_order,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a predefined role with every permission denied.
    #[must_use]
    pub fn new_predefined(tenant_id: TenantId, role_name: RoleName, now: DateTime<Utc>) -> Self {
        Self {
            is_predefined: true,
            ..Self::new_custom(tenant_id, role_name, String::new(), DEFAULT_DISPLAY_ORDER, now)
        }
    }
}
