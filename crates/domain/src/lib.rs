//! Permission schema, role entities and invariants.
//!
//! The schema is compiled in: categories and keys are closed enums, and stored
//! permission maps are normalized to strict booleans when they are read.

#![forbid(unsafe_code)]

mod detailed;
mod legacy;
mod role;
mod routes;
mod security;

pub use detailed::{DetailedBitSet, DetailedPermission, PermissionCategory};
pub use legacy::{LegacyBitSet, LegacyPermission};
pub use role::{
    CustomRole, DEFAULT_DISPLAY_ORDER, DEFAULT_ROLE_NAME, PREDEFINED_ROLE_NAMES, RoleId, RoleName,
};
pub use routes::RoutePermissionMap;
pub use security::AuditAction;
