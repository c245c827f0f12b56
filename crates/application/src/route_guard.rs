use serde::Serialize;

use rolegate_core::{SessionSnapshot, Tier};
use rolegate_domain::{LegacyPermission, RoutePermissionMap};

use crate::ResolvedPermissionState;

/// Route unauthenticated users are sent to.
pub const AUTH_ROUTE: &str = "/auth";

/// Route users are sent back to after an access denial.
pub const FALLBACK_ROUTE: &str = "/dashboard";

const ACCESS_DENIED_TITLE: &str = "Access Denied";

/// Explicit requirements attached to a protected route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteRequirement {
    /// Legacy flag required instead of the path-derived one.
    pub required_permission: Option<LegacyPermission>,
    /// Exact tier required, checked before any permission.
    pub required_role: Option<Tier>,
}

/// Inputs a guard decision is computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardContext {
    /// Current session collaborator snapshot.
    pub session: SessionSnapshot,
    /// Whether the session collaborator is still loading.
    pub session_loading: bool,
    /// Current resolved permissions.
    pub permissions: ResolvedPermissionState,
}

/// Why navigation was redirected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "tier", rename_all = "snake_case")]
pub enum RedirectReason {
    /// No authenticated user.
    Unauthenticated,
    /// The route requires a different tier.
    RoleRequired(Tier),
    /// The resolved permissions do not cover the route.
    AccessDenied,
}

/// Outcome of evaluating a route for the current context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Session or permissions are still resolving.
    Loading,
    /// Navigation must go elsewhere.
    Redirect {
        /// Destination route.
        target: &'static str,
        /// Cause of the redirect.
        reason: RedirectReason,
    },
    /// The route may render.
    Allow,
}

/// User-visible notice shown when access is denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessNotice {
    /// Notice title.
    pub title: &'static str,
    /// Notice body.
    pub description: String,
}

impl AccessNotice {
    fn for_reason(reason: RedirectReason) -> Option<Self> {
        let description = match reason {
            RedirectReason::Unauthenticated => return None,
            RedirectReason::RoleRequired(tier) => format!(
                "This page requires {} role.",
                tier.as_str().replacen('_', " ", 1)
            ),
            RedirectReason::AccessDenied => {
                "You don't have permission to access this page.".to_owned()
            }
        };

        Some(Self {
            title: ACCESS_DENIED_TITLE,
            description,
        })
    }
}

/// Evaluates a route against the current context.
///
/// Precedence: loading, authentication, tier requirement, explicit
/// permission, then the path-derived permission. An explicit permission
/// replaces the path lookup rather than adding to it.
#[must_use]
pub fn evaluate(
    context: &GuardContext,
    path: &str,
    requirement: RouteRequirement,
) -> GuardDecision {
    if context.session_loading || context.permissions.is_loading {
        return GuardDecision::Loading;
    }

    if context.session.user_id.is_none() {
        return GuardDecision::Redirect {
            target: AUTH_ROUTE,
            reason: RedirectReason::Unauthenticated,
        };
    }

    if let Some(required_role) = requirement.required_role
        && context.session.tier != Some(required_role)
    {
        return GuardDecision::Redirect {
            target: FALLBACK_ROUTE,
            reason: RedirectReason::RoleRequired(required_role),
        };
    }

    let has_access = match requirement.required_permission {
        Some(permission) => context.permissions.has_permission(permission),
        None => context.permissions.can_access_route(path),
    };

    if has_access {
        GuardDecision::Allow
    } else {
        GuardDecision::Redirect {
            target: FALLBACK_ROUTE,
            reason: RedirectReason::AccessDenied,
        }
    }
}

/// Rendering state of one protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    /// No access decision yet.
    Loading,
    /// Navigating away from `from`.
    Redirecting {
        /// Path that was denied.
        from: String,
        /// Destination route.
        target: &'static str,
        /// Cause of the redirect.
        reason: RedirectReason,
    },
    /// Protected content may render.
    Rendering,
    /// The fallback route itself is denied; nothing renders and no redirect
    /// is issued.
    Denied {
        /// Path that was denied.
        from: String,
        /// Cause of the denial.
        reason: RedirectReason,
    },
}

impl GuardState {
    fn is_denial(&self) -> bool {
        matches!(
            self,
            Self::Denied { .. }
                | Self::Redirecting {
                    target: FALLBACK_ROUTE,
                    ..
                }
        )
    }
}

/// Stateful guard for one mounted route, re-evaluated on every input change.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    requirement: RouteRequirement,
    state: GuardState,
}

impl RouteGuard {
    /// Creates a guard in the loading state.
    #[must_use]
    pub fn new(requirement: RouteRequirement) -> Self {
        Self {
            requirement,
            state: GuardState::Loading,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> &GuardState {
        &self.state
    }

    /// Re-evaluates after the session, permissions or path changed.
    ///
    /// Returns a notice only when this call transitions into a denial.
    pub fn reevaluate(&mut self, context: &GuardContext, path: &str) -> Option<AccessNotice> {
        let next = match evaluate(context, path, self.requirement) {
            GuardDecision::Loading => GuardState::Loading,
            GuardDecision::Allow => GuardState::Rendering,
            GuardDecision::Redirect { target, reason }
                if target == FALLBACK_ROUTE
                    && RoutePermissionMap::normalize(path).as_deref() == Some(FALLBACK_ROUTE) =>
            {
                GuardState::Denied {
                    from: path.to_owned(),
                    reason,
                }
            }
            GuardDecision::Redirect { target, reason } => GuardState::Redirecting {
                from: path.to_owned(),
                target,
                reason,
            },
        };

        if next == self.state {
            return None;
        }

        let notice = match &next {
            GuardState::Redirecting { reason, .. } | GuardState::Denied { reason, .. }
                if next.is_denial() =>
            {
                AccessNotice::for_reason(*reason)
            }
            _ => None,
        };
        self.state = next;
        notice
    }
}
