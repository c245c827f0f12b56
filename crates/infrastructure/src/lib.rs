//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_audit_repository;
mod in_memory_role_store;
mod postgres_audit_repository;
mod postgres_role_store;
mod timeout_role_store;

pub use in_memory_audit_repository::InMemoryAuditRepository;
pub use in_memory_role_store::InMemoryRoleStore;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_role_store::{PostgresRoleStore, ROLE_CHANGE_CHANNEL};
pub use timeout_role_store::TimeoutRoleStore;
