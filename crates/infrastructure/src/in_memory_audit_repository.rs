use async_trait::async_trait;
use tokio::sync::RwLock;

use rolegate_application::{AuditEvent, AuditRepository};
use rolegate_core::{AppResult, TenantId};

/// In-memory audit trail used when no database is configured.
#[derive(Debug, Default)]
pub struct InMemoryAuditRepository {
    events: RwLock<Vec<AuditEvent>>,
}

impl InMemoryAuditRepository {
    /// Creates an empty audit trail.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the events recorded for a tenant in append order.
    pub async fn events_for(&self, tenant_id: TenantId) -> Vec<AuditEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|event| event.tenant_id == tenant_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.events.write().await.push(event);
        Ok(())
    }
}
