use std::collections::BTreeMap;
use std::str::FromStr;

use rolegate_core::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One flag per top-level application area of the legacy permission model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LegacyPermission {
    /// Dashboard and the general member pages routed through it.
    Dashboard,
    /// Employee directory.
    Employees,
    /// Health checkups.
    HealthCheckups,
    /// Document management.
    Documents,
    /// Reports and analytics.
    Reports,
    /// Audits.
    Audits,
    /// Company settings.
    Settings,
    /// Risk assessments (always granted to members).
    RiskAssessments,
    /// Investigations (always granted to members).
    Investigations,
    /// Incidents (always granted to members).
    Incidents,
    /// Trainings (always granted to members).
    Trainings,
}

impl LegacyPermission {
    /// Number of legacy flags.
    pub const COUNT: usize = 11;

    /// Returns every legacy flag in storage order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[LegacyPermission] = &[
            LegacyPermission::Dashboard,
            LegacyPermission::Employees,
            LegacyPermission::HealthCheckups,
            LegacyPermission::Documents,
            LegacyPermission::Reports,
            LegacyPermission::Audits,
            LegacyPermission::Settings,
            LegacyPermission::RiskAssessments,
            LegacyPermission::Investigations,
            LegacyPermission::Incidents,
            LegacyPermission::Trainings,
        ];

        ALL
    }

    /// Returns the stable storage key of this flag.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Employees => "employees",
            Self::HealthCheckups => "healthCheckups",
            Self::Documents => "documents",
            Self::Reports => "reports",
            Self::Audits => "audits",
            Self::Settings => "settings",
            Self::RiskAssessments => "riskAssessments",
            Self::Investigations => "investigations",
            Self::Incidents => "incidents",
            Self::Trainings => "trainings",
        }
    }

    /// Extended flags are granted to every tenant member regardless of role.
    ///
    /// The detailed model has no equivalent always-on category; the asymmetry
    /// is kept as-is pending product clarification.
    #[must_use]
    pub fn is_extended(&self) -> bool {
        matches!(
            self,
            Self::RiskAssessments | Self::Investigations | Self::Incidents | Self::Trainings
        )
    }

    /// Returns whether the flag is read from role configuration.
    #[must_use]
    pub fn is_configurable(&self) -> bool {
        !self.is_extended()
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl FromStr for LegacyPermission {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|permission| permission.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown legacy permission '{value}'")))
    }
}

/// Fixed record of legacy flags; every flag is always explicitly set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Value", into = "BTreeMap<String, bool>")]
pub struct LegacyBitSet {
    flags: [bool; LegacyPermission::COUNT],
}

impl LegacyBitSet {
    /// Every flag denied.
    #[must_use]
    pub const fn deny_all() -> Self {
        Self {
            flags: [false; LegacyPermission::COUNT],
        }
    }

    /// Every flag granted.
    #[must_use]
    pub const fn grant_all() -> Self {
        Self {
            flags: [true; LegacyPermission::COUNT],
        }
    }

    /// Reads a stored permission map.
    ///
    /// Only a JSON `true` grants a flag. Strings, numbers, `null`, missing keys
    /// and non-object payloads all resolve to `false`; unknown keys are dropped.
    #[must_use]
    pub fn from_stored(value: &Value) -> Self {
        let mut bit_set = Self::deny_all();
        let Some(stored) = value.as_object() else {
            return bit_set;
        };

        for permission in LegacyPermission::all() {
            bit_set.flags[permission.index()] =
                matches!(stored.get(permission.as_str()), Some(Value::Bool(true)));
        }

        bit_set
    }

    /// Returns the flag value.
    #[must_use]
    pub fn get(&self, permission: LegacyPermission) -> bool {
        self.flags[permission.index()]
    }

    /// Sets one flag.
    pub fn set(&mut self, permission: LegacyPermission, value: bool) {
        self.flags[permission.index()] = value;
    }

    /// Returns a copy with one flag set.
    #[must_use]
    pub fn with(mut self, permission: LegacyPermission, value: bool) -> Self {
        self.set(permission, value);
        self
    }

    /// Returns a copy with all extended flags forced on.
    #[must_use]
    pub fn with_extended_granted(mut self) -> Self {
        for permission in LegacyPermission::all() {
            if permission.is_extended() {
                self.set(*permission, true);
            }
        }
        self
    }

    /// Iterates over every flag in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (LegacyPermission, bool)> + '_ {
        LegacyPermission::all()
            .iter()
            .map(|permission| (*permission, self.get(*permission)))
    }
}

impl Default for LegacyBitSet {
    fn default() -> Self {
        Self::deny_all()
    }
}

impl From<Value> for LegacyBitSet {
    fn from(value: Value) -> Self {
        Self::from_stored(&value)
    }
}

impl From<LegacyBitSet> for BTreeMap<String, bool> {
    fn from(value: LegacyBitSet) -> Self {
        value
            .iter()
            .map(|(permission, granted)| (permission.as_str().to_owned(), granted))
            .collect()
    }
}
