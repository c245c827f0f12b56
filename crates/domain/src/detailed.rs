use std::collections::BTreeMap;
use std::str::FromStr;

use rolegate_core::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Category of the fine-grained permission model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionCategory {
    /// Basic collaboration.
    Standard,
    /// Employee data.
    Employees,
    /// Medical examination records.
    HealthExaminations,
    /// Document management.
    Documents,
    /// Audits and corrective actions.
    Audits,
    /// Analytics and exports.
    Reports,
    /// System configuration.
    Settings,
}

impl PermissionCategory {
    /// Returns every category in display order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[PermissionCategory] = &[
            PermissionCategory::Standard,
            PermissionCategory::Employees,
            PermissionCategory::HealthExaminations,
            PermissionCategory::Documents,
            PermissionCategory::Audits,
            PermissionCategory::Reports,
            PermissionCategory::Settings,
        ];

        ALL
    }

    /// Returns the stable storage key of this category.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Employees => "employees",
            Self::HealthExaminations => "health_examinations",
            Self::Documents => "documents",
            Self::Audits => "audits",
            Self::Reports => "reports",
            Self::Settings => "settings",
        }
    }

    /// Returns the display label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::Employees => "Employees",
            Self::HealthExaminations => "Health Examinations",
            Self::Documents => "Documents",
            Self::Audits => "Audits",
            Self::Reports => "Reports",
            Self::Settings => "Settings",
        }
    }

    /// Returns the display description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Standard => "Basic collaboration permissions",
            Self::Employees => "Employee data access and management",
            Self::HealthExaminations => "Medical examination records and evaluations",
            Self::Documents => "Document management and sharing",
            Self::Audits => "Audit management and corrective actions",
            Self::Reports => "Analytics, dashboards and data export",
            Self::Settings => "System configuration and administration",
        }
    }

    /// Iterates over the permissions belonging to this category.
    pub fn permissions(self) -> impl Iterator<Item = DetailedPermission> {
        DetailedPermission::all()
            .iter()
            .copied()
            .filter(move |permission| permission.category() == self)
    }
}

impl FromStr for PermissionCategory {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|category| category.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown permission category '{value}'")))
    }
}

/// One `(category, key)` pair of the fine-grained permission model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum DetailedPermission {
    StandardCollaborateOnCases,
    StandardAssignToTeams,
    EmployeesViewAll,
    EmployeesViewOwnDepartment,
    EmployeesManage,
    EmployeesDelete,
    EmployeesShareProfiles,
    HealthExaminationsViewAll,
    HealthExaminationsViewTeam,
    HealthExaminationsViewOwn,
    HealthExaminationsCreateEdit,
    HealthExaminationsMedicalEvaluations,
    HealthExaminationsDelete,
    DocumentsView,
    DocumentsUpload,
    DocumentsEdit,
    DocumentsDelete,
    AuditsView,
    AuditsCreateEdit,
    AuditsAssignCorrectiveActions,
    AuditsCloseFeedback,
    ReportsView,
    ReportsCreateDashboards,
    ReportsExportData,
    SettingsCompanyLocation,
    SettingsUserRoleManagement,
    SettingsGdprDataProtection,
    SettingsTemplatesCustomFields,
    SettingsSubscriptionBilling,
}

struct Definition {
    permission: DetailedPermission,
    category: PermissionCategory,
    key: &'static str,
    label: &'static str,
    description: &'static str,
}

macro_rules! definition {
    (
        $permission:ident,
        $category:ident,
        $key:literal,
        $label:literal,
        $description:literal $(,)?
    ) => {
        Definition {
            permission: DetailedPermission::$permission,
            category: PermissionCategory::$category,
            key: $key,
            label: $label,
            description: $description,
        }
    };
}

// Indexed by the enum discriminant.
static DEFINITIONS: [Definition; DetailedPermission::COUNT] = [
    definition!(
        StandardCollaborateOnCases,
        Standard,
        "collaborate_on_cases",
        "Collaborate on cases",
        "Add notes and comments to cases",
    ),
    definition!(
        StandardAssignToTeams,
        Standard,
        "assign_to_teams",
        "Assign to teams / departments",
        "Assign items to teams and departments",
    ),
    definition!(
        EmployeesViewAll,
        Employees,
        "view_all",
        "View all employees",
        "Access to view all employee records",
    ),
    definition!(
        EmployeesViewOwnDepartment,
        Employees,
        "view_own_department",
        "View employees (own department)",
        "View employees in your department only",
    ),
    definition!(
        EmployeesManage,
        Employees,
        "manage",
        "Manage employees (create/edit)",
        "Create and edit employee records",
    ),
    definition!(
        EmployeesDelete,
        Employees,
        "delete",
        "Delete employees",
        "Permanently delete employee records",
    ),
    definition!(
        EmployeesShareProfiles,
        Employees,
        "share_profiles",
        "Share employee profiles (internal)",
        "Share employee profiles with other team members",
    ),
    definition!(
        HealthExaminationsViewAll,
        HealthExaminations,
        "view_all",
        "View all examinations",
        "Access to all medical examination records",
    ),
    definition!(
        HealthExaminationsViewTeam,
        HealthExaminations,
        "view_team",
        "View team examinations",
        "View examinations for team members",
    ),
    definition!(
        HealthExaminationsViewOwn,
        HealthExaminations,
        "view_own",
        "View own examinations",
        "View your own examination records",
    ),
    definition!(
        HealthExaminationsCreateEdit,
        HealthExaminations,
        "create_edit",
        "Create & edit examinations",
        "Create and modify examination records",
    ),
    definition!(
        HealthExaminationsMedicalEvaluations,
        HealthExaminations,
        "medical_evaluations",
        "Medical evaluations",
        "Access to medical evaluation data",
    ),
    definition!(
        HealthExaminationsDelete,
        HealthExaminations,
        "delete",
        "Delete examinations",
        "Permanently delete examination records",
    ),
    definition!(DocumentsView, Documents, "view", "View documents", "Access to view documents"),
    definition!(
        DocumentsUpload,
        Documents,
        "upload",
        "Upload documents",
        "Upload new documents to the system",
    ),
    definition!(DocumentsEdit, Documents, "edit", "Edit documents", "Modify existing documents"),
    definition!(
        DocumentsDelete,
        Documents,
        "delete",
        "Delete documents",
        "Permanently delete documents",
    ),
    definition!(AuditsView, Audits, "view", "View audits", "Access to view audit records"),
    definition!(
        AuditsCreateEdit,
        Audits,
        "create_edit",
        "Create & edit audits",
        "Create and modify audit records",
    ),
    definition!(
        AuditsAssignCorrectiveActions,
        Audits,
        "assign_corrective_actions",
        "Assign corrective actions",
        "Assign corrective actions to team members",
    ),
    definition!(
        AuditsCloseFeedback,
        Audits,
        "close_feedback",
        "Close / feedback on actions",
        "Close actions and provide feedback",
    ),
    definition!(
        ReportsView,
        Reports,
        "view",
        "View reports",
        "Access to view reports and analytics",
    ),
    definition!(
        ReportsCreateDashboards,
        Reports,
        "create_dashboards",
        "Create & manage dashboards",
        "Create and customize dashboards",
    ),
    definition!(
        ReportsExportData,
        Reports,
        "export_data",
        "Export data (CSV / PDF)",
        "Export data in various formats",
    ),
    definition!(
        SettingsCompanyLocation,
        Settings,
        "company_location",
        "Company & location settings",
        "Configure company and location settings",
    ),
    definition!(
        SettingsUserRoleManagement,
        Settings,
        "user_role_management",
        "User & role management",
        "Manage users and their roles",
    ),
    definition!(
        SettingsGdprDataProtection,
        Settings,
        "gdpr_data_protection",
        "GDPR / data protection settings",
        "Configure GDPR and data protection",
    ),
    definition!(
        SettingsTemplatesCustomFields,
        Settings,
        "templates_custom_fields",
        "Templates, custom fields, categories",
        "Manage templates and custom fields",
    ),
    definition!(
        SettingsSubscriptionBilling,
        Settings,
        "subscription_billing",
        "Subscription & billing",
        "Manage subscription and billing settings",
    ),
];

impl DetailedPermission {
    /// Number of detailed permissions across all categories.
    pub const COUNT: usize = 29;

    /// Returns every detailed permission grouped by category.
    #[must_use]
    pub fn all() -> &'static [Self] {
        static ALL: [DetailedPermission; DetailedPermission::COUNT] = {
            let mut all =
                [DetailedPermission::StandardCollaborateOnCases; DetailedPermission::COUNT];
            let mut index = 0;
            while index < DetailedPermission::COUNT {
                all[index] = DEFINITIONS[index].permission;
                index += 1;
            }
            all
        };

        &ALL
    }

    /// Looks up a permission from its storage pair.
    #[must_use]
    pub fn from_parts(category: PermissionCategory, key: &str) -> Option<Self> {
        category.permissions().find(|permission| permission.key() == key)
    }

    /// Returns the owning category.
    #[must_use]
    pub fn category(&self) -> PermissionCategory {
        self.definition().category
    }

    /// Returns the storage key inside the category.
    #[must_use]
    pub fn key(&self) -> &'static str {
        self.definition().key
    }

    /// Returns the display label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.definition().label
    }

    /// Returns the display description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        self.definition().description
    }

    fn index(self) -> usize {
        self as usize
    }

    fn definition(&self) -> &'static Definition {
        &DEFINITIONS[self.index()]
    }
}

/// Fixed record of detailed permissions; every flag is always explicitly set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Value", into = "BTreeMap<String, BTreeMap<String, bool>>")]
pub struct DetailedBitSet {
    flags: [bool; DetailedPermission::COUNT],
}

impl DetailedBitSet {
    /// Every permission denied. Default for new roles.
    #[must_use]
    pub const fn deny_all() -> Self {
        Self {
            flags: [false; DetailedPermission::COUNT],
        }
    }

    /// Every permission granted.
    #[must_use]
    pub const fn grant_all() -> Self {
        Self {
            flags: [true; DetailedPermission::COUNT],
        }
    }

    /// Reads a stored `category -> key -> bool` map.
    ///
    /// Missing or non-object categories take the all-false default, only a
    /// JSON `true` grants, and unknown categories or keys are ignored.
    #[must_use]
    pub fn from_stored(value: &Value) -> Self {
        let mut bit_set = Self::deny_all();
        let Some(stored) = value.as_object() else {
            return bit_set;
        };

        for permission in DetailedPermission::all() {
            let granted = stored
                .get(permission.category().as_str())
                .and_then(Value::as_object)
                .and_then(|category| category.get(permission.key()));
            bit_set.flags[permission.index()] = matches!(granted, Some(Value::Bool(true)));
        }

        bit_set
    }

    /// Returns the flag value.
    #[must_use]
    pub fn get(&self, permission: DetailedPermission) -> bool {
        self.flags[permission.index()]
    }

    /// Sets one flag.
    pub fn set(&mut self, permission: DetailedPermission, value: bool) {
        self.flags[permission.index()] = value;
    }

    /// Returns a copy with one flag set.
    #[must_use]
    pub fn with(mut self, permission: DetailedPermission, value: bool) -> Self {
        self.set(permission, value);
        self
    }

    /// Counts granted permissions.
    #[must_use]
    pub fn granted_count(&self) -> usize {
        self.flags.iter().filter(|granted| **granted).count()
    }

    /// Iterates over every flag grouped by category.
    pub fn iter(&self) -> impl Iterator<Item = (DetailedPermission, bool)> + '_ {
        DetailedPermission::all()
            .iter()
            .map(|permission| (*permission, self.get(*permission)))
    }
}

impl Default for DetailedBitSet {
    fn default() -> Self {
        Self::deny_all()
    }
}

impl From<Value> for DetailedBitSet {
    fn from(value: Value) -> Self {
        Self::from_stored(&value)
    }
}

impl From<DetailedBitSet> for BTreeMap<String, BTreeMap<String, bool>> {
    fn from(value: DetailedBitSet) -> Self {
        let mut categories: Self = BTreeMap::new();
        for (permission, granted) in value.iter() {
            categories
                .entry(permission.category().as_str().to_owned())
                .or_default()
                .insert(permission.key().to_owned(), granted);
        }
        categories
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use serde_json::json;

    use super::{DetailedBitSet, DetailedPermission, PermissionCategory};

    #[test]
    fn definitions_line_up_with_discriminants() {
        for (index, permission) in DetailedPermission::all().iter().enumerate() {
            assert_eq!(*permission as usize, index);
        }
    }

    #[test]
    fn category_sizes_match_schema() {
        let sizes: Vec<usize> = PermissionCategory::all()
            .iter()
            .map(|category| category.permissions().count())
            .collect();

        assert_eq!(sizes, vec![2, 5, 6, 4, 4, 3, 5]);
    }

    #[test]
    fn from_parts_is_scoped_to_category() {
        assert_eq!(
            DetailedPermission::from_parts(PermissionCategory::Audits, "view"),
            Some(DetailedPermission::AuditsView)
        );
        assert_eq!(
            DetailedPermission::from_parts(PermissionCategory::Documents, "view"),
            Some(DetailedPermission::DocumentsView)
        );
        assert_eq!(
            DetailedPermission::from_parts(PermissionCategory::Standard, "view"),
            None
        );
        assert!(PermissionCategory::from_str("billing").is_err());
    }

    #[test]
    fn missing_categories_take_the_deny_default() {
        let stored = json!({
            "audits": { "view": true, "create_edit": "true" },
            "reports": null,
            "finance": { "approve": true }
        });

        let bit_set = DetailedBitSet::from_stored(&stored);

        assert!(bit_set.get(DetailedPermission::AuditsView));
        assert!(!bit_set.get(DetailedPermission::AuditsCreateEdit));
        assert!(!bit_set.get(DetailedPermission::ReportsView));
        assert_eq!(bit_set.granted_count(), 1);
    }

    #[test]
    fn serializes_nested_categories() {
        let value = serde_json::to_value(
            DetailedBitSet::deny_all().with(DetailedPermission::SettingsUserRoleManagement, true),
        )
        .unwrap_or_else(|_| unreachable!());

        assert_eq!(value["settings"]["user_role_management"], json!(true));
        assert_eq!(value["health_examinations"]["medical_evaluations"], json!(false));

        let restored: DetailedBitSet =
            serde_json::from_value(value).unwrap_or_else(|_| unreachable!());
        assert_eq!(restored.granted_count(), 1);
    }
}
