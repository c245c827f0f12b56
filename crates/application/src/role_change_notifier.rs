use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use rolegate_core::{AppResult, TenantId, Tier, UserId};
use rolegate_domain::RoleName;

use crate::{RoleChangeStream, RoleConfigChanged, RoleStore};

/// Retry behavior when a change subscription cannot be opened or drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionRetryPolicy {
    /// Consecutive failures tolerated before the subscription is left inactive.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub retry_delay: Duration,
}

impl Default for SubscriptionRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_millis(1000),
        }
    }
}

/// Receives role changes relevant to one subscribed member.
#[async_trait]
pub trait RoleChangeListener: Send + Sync {
    /// Called when the member's current role was mutated.
    async fn role_config_changed(&self, event: RoleConfigChanged);

    /// Called once the change stream is open again after it closed or
    /// failed. Changes made in between were not observed.
    async fn changes_missed(&self);
}

/// Live change subscription. Dropping it stops delivery.
#[derive(Debug)]
pub struct RoleChangeSubscription {
    tenant_id: TenantId,
    handle: JoinHandle<()>,
}

impl RoleChangeSubscription {
    /// Tenant the subscription listens to.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns whether the delivery task is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for RoleChangeSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Watches role configuration mutations on behalf of one member.
#[derive(Clone)]
pub struct RoleChangeNotifier {
    store: Arc<dyn RoleStore>,
    retry_policy: SubscriptionRetryPolicy,
}

impl RoleChangeNotifier {
    /// Creates a notifier over a role store.
    #[must_use]
    pub fn new(store: Arc<dyn RoleStore>, retry_policy: SubscriptionRetryPolicy) -> Self {
        Self {
            store,
            retry_policy,
        }
    }

    /// Subscribes a member to changes of their own role.
    ///
    /// Returns `None` for tiers whose permissions never depend on role
    /// configuration. The first stream is opened before this returns, so a
    /// resolution started afterwards cannot miss an edit. Must be called
    /// inside a tokio runtime.
    pub async fn subscribe(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
        tier: Tier,
        listener: Arc<dyn RoleChangeListener>,
    ) -> Option<RoleChangeSubscription> {
        if tier.bypasses_role_configuration() {
            return None;
        }

        let opened = self.store.subscribe_role_config_changes(tenant_id).await;
        let worker = SubscriptionWorker {
            store: self.store.clone(),
            retry_policy: self.retry_policy,
            user_id,
            tenant_id,
            listener,
        };

        Some(RoleChangeSubscription {
            tenant_id,
            handle: tokio::spawn(worker.run(opened)),
        })
    }
}

struct SubscriptionWorker {
    store: Arc<dyn RoleStore>,
    retry_policy: SubscriptionRetryPolicy,
    user_id: UserId,
    tenant_id: TenantId,
    listener: Arc<dyn RoleChangeListener>,
}

impl SubscriptionWorker {
    async fn run(self, mut opened: AppResult<RoleChangeStream>) {
        let tenant_id = self.tenant_id;
        let mut consecutive_failures = 0_u32;
        let mut reopened = false;

        loop {
            match opened {
                Ok(mut stream) => {
                    debug!(%tenant_id, user_id = %self.user_id, "role change subscription open");
                    if reopened {
                        self.listener.changes_missed().await;
                    }
                    while let Some(event) = stream.recv().await {
                        consecutive_failures = 0;
                        self.deliver(event).await;
                    }
                    warn!(%tenant_id, "role change stream closed");
                }
                Err(error) => {
                    warn!(%tenant_id, error = %error, "role change subscription failed");
                }
            }

            reopened = true;
            consecutive_failures += 1;
            if consecutive_failures >= self.retry_policy.max_attempts {
                error!(
                    %tenant_id,
                    attempts = consecutive_failures,
                    "role change subscription left inactive"
                );
                return;
            }
            tokio::time::sleep(self.retry_policy.retry_delay).await;
            opened = self.store.subscribe_role_config_changes(tenant_id).await;
        }
    }

    async fn deliver(&self, event: RoleConfigChanged) {
        if event.tenant_id != self.tenant_id {
            return;
        }

        if let Some(current_role) = self.current_role().await
            && current_role != event.role_name
        {
            debug!(
                tenant_id = %self.tenant_id,
                changed_role = %event.role_name,
                %current_role,
                "ignoring change to unrelated role"
            );
            return;
        }

        self.listener.role_config_changed(event).await;
    }

    // `None` when the assignment cannot be read; the change is then treated as
    // relevant so the full resolver decides.
    async fn current_role(&self) -> Option<RoleName> {
        match self
            .store
            .get_assigned_role(self.user_id, self.tenant_id)
            .await
        {
            Ok(role_name) => Some(role_name.unwrap_or_else(RoleName::default_role)),
            Err(error) => {
                warn!(
                    tenant_id = %self.tenant_id,
                    user_id = %self.user_id,
                    error = %error,
                    "could not re-read role assignment"
                );
                None
            }
        }
    }
}
