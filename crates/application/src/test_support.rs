use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, Notify, mpsc};

use rolegate_core::{AppError, AppResult, SessionSnapshot, TenantId, Tier, UserId};
use rolegate_domain::{CustomRole, DetailedBitSet, LegacyBitSet, RoleName};

use crate::{
    AuditEvent, AuditRepository, ROLE_CHANGE_CHANNEL_CAPACITY, RoleChangeStream,
    RoleConfigChanged, RoleStore,
};

pub(crate) fn role_name(value: &str) -> RoleName {
    RoleName::new(value).unwrap_or_else(|_| unreachable!())
}

pub(crate) fn member_session(user_id: UserId, tenant_id: TenantId) -> SessionSnapshot {
    SessionSnapshot::authenticated(user_id, tenant_id, Tier::StandardMember)
}

pub(crate) fn configured_role(
    tenant_id: TenantId,
    name: &str,
    legacy: LegacyBitSet,
    detailed: DetailedBitSet,
) -> CustomRole {
    let mut role = CustomRole::new_custom(tenant_id, role_name(name), "", 100, Utc::now());
    role.legacy_permissions = legacy;
    role.detailed_permissions = detailed;
    role
}

#[derive(Default)]
pub(crate) struct FakeRoleStore {
    roles: Mutex<HashMap<(TenantId, RoleName), CustomRole>>,
    assignments: Mutex<HashMap<(UserId, TenantId), RoleName>>,
    subscribers: Mutex<Vec<(TenantId, mpsc::Sender<RoleConfigChanged>)>>,
    gates: Mutex<HashMap<TenantId, Arc<Notify>>>,
    assignment_gate: Mutex<Option<Arc<Notify>>>,
    pub(crate) fail_assignment_lookup: AtomicBool,
    pub(crate) fail_config_lookup: AtomicBool,
    pub(crate) failing_subscribe_attempts: AtomicUsize,
    pub(crate) subscribe_calls: AtomicUsize,
    pub(crate) config_lookups: AtomicUsize,
}

impl FakeRoleStore {
    pub(crate) async fn put_role(&self, role: CustomRole) {
        self.roles
            .lock()
            .await
            .insert((role.tenant_id, role.role_name.clone()), role);
    }

    pub(crate) async fn assign(&self, user_id: UserId, tenant_id: TenantId, name: &str) {
        self.assignments
            .lock()
            .await
            .insert((user_id, tenant_id), role_name(name));
    }

    /// Blocks role configuration lookups for the tenant until released.
    pub(crate) async fn hold_config_lookups(&self, tenant_id: TenantId) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().await.insert(tenant_id, gate.clone());
        gate
    }

    /// Blocks the next assignment lookup until released.
    pub(crate) async fn hold_next_assignment_lookup(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.assignment_gate.lock().await = Some(gate.clone());
        gate
    }

    pub(crate) async fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock().await;
        subscribers.retain(|(_, sender)| !sender.is_closed());
        subscribers.len()
    }

    /// Drops every open subscription channel, ending the streams.
    pub(crate) async fn close_subscriptions(&self) {
        self.subscribers.lock().await.clear();
    }

    pub(crate) async fn notify_changed(&self, tenant_id: TenantId, role_name: &RoleName) {
        let event = RoleConfigChanged {
            tenant_id,
            role_name: role_name.clone(),
            mutated_at: Utc::now(),
        };
        // A full buffer disconnects the subscriber, like the in-memory adapter.
        self.subscribers
            .lock()
            .await
            .retain(|(subscribed_tenant, sender)| {
                if *subscribed_tenant != tenant_id {
                    return !sender.is_closed();
                }
                sender.try_send(event.clone()).is_ok()
            });
    }
}

#[async_trait]
impl RoleStore for FakeRoleStore {
    async fn get_assigned_role(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> AppResult<Option<RoleName>> {
        let gate = self.assignment_gate.lock().await.take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_assignment_lookup.load(Ordering::SeqCst) {
            return Err(AppError::Unavailable("assignment lookup timed out".to_owned()));
        }

        Ok(self
            .assignments
            .lock()
            .await
            .get(&(user_id, tenant_id))
            .cloned())
    }

    async fn get_role_config(
        &self,
        tenant_id: TenantId,
        role_name: &RoleName,
    ) -> AppResult<Option<CustomRole>> {
        if self.fail_config_lookup.load(Ordering::SeqCst) {
            return Err(AppError::Internal("role config lookup failed".to_owned()));
        }

        let role = self
            .roles
            .lock()
            .await
            .get(&(tenant_id, role_name.clone()))
            .cloned();
        self.config_lookups.fetch_add(1, Ordering::SeqCst);

        // Read first, then wait, so a held lookup returns data older than
        // anything written while it was parked.
        let gate = self.gates.lock().await.remove(&tenant_id);
        if let Some(gate) = gate {
            gate.notified().await;
        }

        Ok(role)
    }

    async fn list_role_configs(&self, tenant_id: TenantId) -> AppResult<Vec<CustomRole>> {
        Ok(self
            .roles
            .lock()
            .await
            .values()
            .filter(|role| role.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn insert_role_config(&self, role: CustomRole) -> AppResult<CustomRole> {
        let mut roles = self.roles.lock().await;
        let key = (role.tenant_id, role.role_name.clone());
        if roles.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.role_name
            )));
        }
        roles.insert(key, role.clone());
        drop(roles);

        self.notify_changed(role.tenant_id, &role.role_name).await;
        Ok(role)
    }

    async fn update_role_config(&self, role: CustomRole) -> AppResult<CustomRole> {
        {
            let mut roles = self.roles.lock().await;
            let key = (role.tenant_id, role.role_name.clone());
            let Some(stored) = roles.get_mut(&key) else {
                return Err(AppError::NotFound(format!(
                    "role '{}' does not exist",
                    role.role_name
                )));
            };
            *stored = role.clone();
        }

        self.notify_changed(role.tenant_id, &role.role_name).await;
        Ok(role)
    }

    async fn delete_role_config(
        &self,
        tenant_id: TenantId,
        role_name: &RoleName,
    ) -> AppResult<()> {
        let removed = self
            .roles
            .lock()
            .await
            .remove(&(tenant_id, role_name.clone()));
        if removed.is_none() {
            return Err(AppError::NotFound(format!(
                "role '{role_name}' does not exist"
            )));
        }

        self.notify_changed(tenant_id, role_name).await;
        Ok(())
    }

    async fn subscribe_role_config_changes(
        &self,
        tenant_id: TenantId,
    ) -> AppResult<RoleChangeStream> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let remaining_failures = self.failing_subscribe_attempts.load(Ordering::SeqCst);
        if remaining_failures > 0 {
            self.failing_subscribe_attempts
                .store(remaining_failures - 1, Ordering::SeqCst);
            return Err(AppError::Unavailable("realtime channel unavailable".to_owned()));
        }

        let (sender, receiver) = mpsc::channel(ROLE_CHANGE_CHANNEL_CAPACITY);
        self.subscribers.lock().await.push((tenant_id, sender));
        Ok(receiver)
    }
}

#[derive(Default)]
pub(crate) struct FakeAuditRepository {
    pub(crate) events: Mutex<Vec<AuditEvent>>,
    pub(crate) fail: AtomicBool,
}

#[async_trait]
impl AuditRepository for FakeAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Internal("audit sink unavailable".to_owned()));
        }
        self.events.lock().await.push(event);
        Ok(())
    }
}
