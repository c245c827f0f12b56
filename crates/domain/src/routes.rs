use crate::LegacyPermission;

/// Static mapping from a normalized route to the legacy flag gating it.
///
/// The map is closed-world: a route that is not listed maps to nothing and
/// callers must deny it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoutePermissionMap;

const ROUTE_PERMISSIONS: &[(&str, LegacyPermission)] = &[
    ("/dashboard", LegacyPermission::Dashboard),
    ("/employees", LegacyPermission::Employees),
    ("/investigations", LegacyPermission::Investigations),
    ("/risk-assessments", LegacyPermission::RiskAssessments),
    ("/training", LegacyPermission::Trainings),
    ("/incidents", LegacyPermission::Incidents),
    ("/audits", LegacyPermission::Audits),
    ("/reports", LegacyPermission::Reports),
    ("/settings", LegacyPermission::Settings),
    ("/documents", LegacyPermission::Documents),
    ("/health-checkups", LegacyPermission::HealthCheckups),
    ("/activity-groups", LegacyPermission::RiskAssessments),
    ("/measures", LegacyPermission::RiskAssessments),
    ("/tasks", LegacyPermission::Dashboard),
    ("/messages", LegacyPermission::Dashboard),
    ("/profile", LegacyPermission::Dashboard),
    ("/invoices", LegacyPermission::Dashboard),
];

impl RoutePermissionMap {
    /// Reduces an absolute path to `/<first segment>`, dropping query and fragment.
    ///
    /// `/audits/42?tab=actions` becomes `/audits`. The first segment is the
    /// one after the single leading slash, so `//audits` becomes `/`. A path
    /// without a leading slash has no route and yields `None`.
    #[must_use]
    pub fn normalize(path: &str) -> Option<String> {
        let without_suffix = path.split(['?', '#']).next().unwrap_or_default();
        let rest = without_suffix.strip_prefix('/')?;
        let first_segment = rest.split('/').next().unwrap_or_default();

        Some(format!("/{first_segment}"))
    }

    /// Returns the legacy flag required for a path, if the route is mapped.
    #[must_use]
    pub fn permission_for(path: &str) -> Option<LegacyPermission> {
        let normalized = Self::normalize(path)?;
        ROUTE_PERMISSIONS
            .iter()
            .find(|(route, _)| *route == normalized)
            .map(|(_, permission)| *permission)
    }

    /// Returns every mapped route.
    #[must_use]
    pub fn entries() -> &'static [(&'static str, LegacyPermission)] {
        ROUTE_PERMISSIONS
    }
}
