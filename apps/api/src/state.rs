use rolegate_application::{
    PermissionResolver, PermissionSession, RoleChangeNotifier, RoleConfigService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub resolver: PermissionResolver,
    pub notifier: RoleChangeNotifier,
    pub role_config_service: RoleConfigService,
}

impl AppState {
    /// Opens a session-scoped permission context for one long-lived client.
    pub fn open_permission_session(&self) -> PermissionSession {
        PermissionSession::new(self.resolver.clone(), self.notifier.clone())
    }
}
