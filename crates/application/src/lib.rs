//! Application services and ports for permission resolution and role editing.

#![forbid(unsafe_code)]

mod audit_ports;
mod permission_resolver;
mod permission_session;
mod resolved_permission_state;
mod role_change_notifier;
mod role_config_service;
mod role_store_ports;
mod route_guard;

#[cfg(test)]
mod test_support;

pub use audit_ports::{AuditEvent, AuditRepository, RoleChange};
pub use permission_resolver::PermissionResolver;
pub use permission_session::PermissionSession;
pub use resolved_permission_state::ResolvedPermissionState;
pub use role_change_notifier::{
    RoleChangeListener, RoleChangeNotifier, RoleChangeSubscription, SubscriptionRetryPolicy,
};
pub use role_config_service::{RoleConfigService, RoleEditorError, RoleEditorResult};
pub use role_store_ports::{
    ROLE_CHANGE_CHANNEL_CAPACITY, RoleChangeStream, RoleConfigChanged, RoleStore,
};
pub use route_guard::{
    AUTH_ROUTE, AccessNotice, FALLBACK_ROUTE, GuardContext, GuardDecision, GuardState,
    RedirectReason, RouteGuard, RouteRequirement, evaluate as evaluate_route,
};
