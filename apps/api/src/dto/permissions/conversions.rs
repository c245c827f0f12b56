use rolegate_application::{AccessNotice, GuardState, RedirectReason, ResolvedPermissionState};
use rolegate_domain::{DetailedPermission, LegacyPermission, PermissionCategory, RoutePermissionMap};

use super::{
    AccessNoticeResponse, LegacyPermissionResponse, PermissionCategoryResponse,
    PermissionDefinitionResponse, PermissionSchemaResponse, PermissionStateResponse,
    RouteCheckResponse, RoutePermissionResponse,
};

impl From<&ResolvedPermissionState> for PermissionStateResponse {
    fn from(value: &ResolvedPermissionState) -> Self {
        Self {
            role_name: value.role_name.clone(),
            tier: value.tier.map(|tier| tier.as_str().to_owned()),
            is_loading: value.is_loading,
            resolved_at: value.resolved_at.to_rfc3339(),
            permissions: value.legacy.into(),
            detailed_permissions: value.detailed.into(),
            granted_detailed_count: value.detailed.granted_count(),
            total_detailed_count: DetailedPermission::all().len(),
        }
    }
}

impl From<DetailedPermission> for PermissionDefinitionResponse {
    fn from(value: DetailedPermission) -> Self {
        Self {
            key: value.key().to_owned(),
            label: value.label().to_owned(),
            description: value.description().to_owned(),
        }
    }
}

impl From<PermissionCategory> for PermissionCategoryResponse {
    fn from(value: PermissionCategory) -> Self {
        Self {
            key: value.as_str().to_owned(),
            label: value.label().to_owned(),
            description: value.description().to_owned(),
            permissions: value
                .permissions()
                .map(PermissionDefinitionResponse::from)
                .collect(),
        }
    }
}

impl PermissionSchemaResponse {
    pub fn catalog() -> Self {
        Self {
            categories: PermissionCategory::all()
                .iter()
                .copied()
                .map(PermissionCategoryResponse::from)
                .collect(),
            legacy_permissions: LegacyPermission::all()
                .iter()
                .map(|permission| LegacyPermissionResponse {
                    key: permission.as_str().to_owned(),
                    configurable: permission.is_configurable(),
                })
                .collect(),
            routes: RoutePermissionMap::entries()
                .iter()
                .map(|(path, permission)| RoutePermissionResponse {
                    path: (*path).to_owned(),
                    permission: permission.as_str().to_owned(),
                })
                .collect(),
            total_detailed_count: DetailedPermission::all().len(),
        }
    }
}

impl From<AccessNotice> for AccessNoticeResponse {
    fn from(value: AccessNotice) -> Self {
        Self {
            title: value.title.to_owned(),
            description: value.description,
        }
    }
}

fn reason_fields(reason: RedirectReason) -> (String, Option<String>) {
    match reason {
        RedirectReason::Unauthenticated => ("unauthenticated".to_owned(), None),
        RedirectReason::RoleRequired(tier) => {
            ("role_required".to_owned(), Some(tier.as_str().to_owned()))
        }
        RedirectReason::AccessDenied => ("access_denied".to_owned(), None),
    }
}

impl RouteCheckResponse {
    pub fn from_guard(state: &GuardState, notice: Option<AccessNotice>) -> Self {
        let (decision, target, reason) = match state {
            GuardState::Loading => ("loading", None, None),
            GuardState::Rendering => ("allow", None, None),
            GuardState::Redirecting { target, reason, .. } => {
                ("redirect", Some((*target).to_owned()), Some(*reason))
            }
            GuardState::Denied { reason, .. } => ("denied", None, Some(*reason)),
        };
        let (reason, required_role) = match reason.map(reason_fields) {
            Some((reason, required_role)) => (Some(reason), required_role),
            None => (None, None),
        };

        Self {
            decision: decision.to_owned(),
            target,
            reason,
            required_role,
            notice: notice.map(AccessNoticeResponse::from),
        }
    }
}
