use chrono::{DateTime, Utc};
use serde::Serialize;

use rolegate_core::Tier;
use rolegate_domain::{
    DetailedBitSet, DetailedPermission, LegacyBitSet, LegacyPermission, PermissionCategory,
    RoleName, RoutePermissionMap,
};

/// Session-scoped snapshot of what a user may currently do.
///
/// Every flag is explicitly set. The state is replaced wholesale on each
/// resolution and never patched in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPermissionState {
    /// Coarse per-area flags.
    pub legacy: LegacyBitSet,
    /// Fine-grained per-category flags.
    pub detailed: DetailedBitSet,
    /// Assigned role name, or the tier label for admin tiers.
    pub role_name: Option<String>,
    /// Tier the state was resolved for. Absent while loading or signed out.
    pub tier: Option<Tier>,
    /// Completion time of the resolution.
    pub resolved_at: DateTime<Utc>,
    /// Whether a resolution is still in flight.
    pub is_loading: bool,
}

impl ResolvedPermissionState {
    /// Deny-all state without a role, used for every fail-closed outcome.
    #[must_use]
    pub fn deny_all(resolved_at: DateTime<Utc>) -> Self {
        Self {
            legacy: LegacyBitSet::deny_all(),
            detailed: DetailedBitSet::deny_all(),
            role_name: None,
            tier: None,
            resolved_at,
            is_loading: false,
        }
    }

    /// Deny-all placeholder published while a resolution is in flight.
    #[must_use]
    pub fn loading(now: DateTime<Utc>) -> Self {
        Self {
            is_loading: true,
            ..Self::deny_all(now)
        }
    }

    /// Grant-all state for a tier that bypasses role configuration.
    #[must_use]
    pub fn tier_grant(tier: Tier, resolved_at: DateTime<Utc>) -> Self {
        Self {
            legacy: LegacyBitSet::grant_all(),
            detailed: DetailedBitSet::grant_all(),
            role_name: tier.display_label().map(str::to_owned),
            tier: Some(tier),
            resolved_at,
            is_loading: false,
        }
    }

    /// Member state built from a stored role configuration.
    #[must_use]
    pub fn member(
        role_name: &RoleName,
        legacy: LegacyBitSet,
        detailed: DetailedBitSet,
        resolved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            legacy,
            detailed,
            role_name: Some(role_name.as_str().to_owned()),
            tier: Some(Tier::StandardMember),
            resolved_at,
            is_loading: false,
        }
    }

    /// Deny-all member state that still reports the assigned role.
    #[must_use]
    pub fn member_denied(role_name: &RoleName, resolved_at: DateTime<Utc>) -> Self {
        Self::member(
            role_name,
            LegacyBitSet::deny_all(),
            DetailedBitSet::deny_all(),
            resolved_at,
        )
    }

    fn bypasses_checks(&self) -> bool {
        !self.is_loading
            && self
                .tier
                .is_some_and(|tier| tier.bypasses_role_configuration())
    }

    /// Returns whether a legacy flag is granted.
    #[must_use]
    pub fn has_permission(&self, permission: LegacyPermission) -> bool {
        self.bypasses_checks() || self.legacy.get(permission)
    }

    /// Returns whether a detailed permission is granted.
    #[must_use]
    pub fn has_detailed_permission(&self, permission: DetailedPermission) -> bool {
        self.bypasses_checks() || self.detailed.get(permission)
    }

    /// Returns whether a detailed permission named by transport strings is granted.
    ///
    /// Names outside the compiled schema are inert and never granted.
    #[must_use]
    pub fn has_detailed_permission_named(&self, category: &str, key: &str) -> bool {
        let Ok(category) = category.parse::<PermissionCategory>() else {
            return false;
        };
        DetailedPermission::from_parts(category, key)
            .is_some_and(|permission| self.has_detailed_permission(permission))
    }

    /// Returns whether the route is reachable. Unmapped routes are denied.
    #[must_use]
    pub fn can_access_route(&self, path: &str) -> bool {
        if self.bypasses_checks() {
            return true;
        }

        RoutePermissionMap::permission_for(path)
            .is_some_and(|permission| self.legacy.get(permission))
    }

    /// Compares two states ignoring `resolved_at`.
    #[must_use]
    pub fn same_grants(&self, other: &Self) -> bool {
        self.legacy == other.legacy
            && self.detailed == other.detailed
            && self.role_name == other.role_name
            && self.tier == other.tier
            && self.is_loading == other.is_loading
    }
}
