use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use rolegate_core::{SessionSnapshot, TenantId, UserId};

use crate::{
    GuardContext, PermissionResolver, ResolvedPermissionState, RoleChangeListener,
    RoleChangeNotifier, RoleChangeSubscription, RoleConfigChanged,
};

/// Identifies one resolution attempt for the staleness guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResolutionTag {
    context: Option<(UserId, TenantId)>,
    generation: u64,
    attempt: u64,
}

struct SessionGuard {
    snapshot: SessionSnapshot,
    generation: u64,
    next_attempt: u64,
    applied_attempt: u64,
    subscription: Option<RoleChangeSubscription>,
    follower: Option<JoinHandle<()>>,
}

impl SessionGuard {
    fn issue_tag(&mut self) -> ResolutionTag {
        self.next_attempt += 1;
        ResolutionTag {
            context: self.snapshot.context(),
            generation: self.generation,
            attempt: self.next_attempt,
        }
    }

    fn is_current(&self, tag: &ResolutionTag) -> bool {
        tag.generation == self.generation && tag.context == self.snapshot.context()
    }
}

struct SessionInner {
    resolver: PermissionResolver,
    notifier: RoleChangeNotifier,
    guard: Mutex<SessionGuard>,
    state: watch::Sender<ResolvedPermissionState>,
}

impl SessionInner {
    fn lock(&self) -> MutexGuard<'_, SessionGuard> {
        self.guard.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies a completed resolution unless a newer one superseded it.
    fn apply(&self, tag: ResolutionTag, state: ResolvedPermissionState) -> bool {
        let mut guard = self.lock();
        if !guard.is_current(&tag) || tag.attempt <= guard.applied_attempt {
            debug!(
                generation = tag.generation,
                attempt = tag.attempt,
                "discarding stale permission resolution"
            );
            return false;
        }

        guard.applied_attempt = tag.attempt;
        self.state.send_replace(state);
        true
    }

    async fn refresh(&self, expected_generation: Option<u64>) {
        let (snapshot, tag) = {
            let mut guard = self.lock();
            if expected_generation.is_some_and(|generation| generation != guard.generation) {
                return;
            }
            (guard.snapshot, guard.issue_tag())
        };

        let state = self.resolver.resolve(&snapshot).await;
        self.apply(tag, state);
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        let guard = self.guard.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(follower) = guard.follower.take() {
            follower.abort();
        }
    }
}

struct SessionRefresher {
    inner: Weak<SessionInner>,
    generation: u64,
}

#[async_trait]
impl RoleChangeListener for SessionRefresher {
    async fn role_config_changed(&self, event: RoleConfigChanged) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };

        debug!(
            tenant_id = %event.tenant_id,
            role_name = %event.role_name,
            "re-resolving permissions after role change"
        );
        inner.refresh(Some(self.generation)).await;
    }

    async fn changes_missed(&self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };

        debug!("re-resolving permissions after role change stream gap");
        inner.refresh(Some(self.generation)).await;
    }
}

/// Session-scoped owner of the single live [`ResolvedPermissionState`].
///
/// Context switches, refreshes and role change notifications all funnel
/// through the same resolve-then-apply path. A completed resolution is
/// applied only if it was issued for the current `(user, tenant)` context
/// and no later-issued resolution has been applied already.
#[derive(Clone)]
pub struct PermissionSession {
    inner: Arc<SessionInner>,
}

impl PermissionSession {
    /// Creates a signed-out session publishing a deny-all state.
    #[must_use]
    pub fn new(resolver: PermissionResolver, notifier: RoleChangeNotifier) -> Self {
        let (state, _) = watch::channel(ResolvedPermissionState::deny_all(Utc::now()));

        Self {
            inner: Arc::new(SessionInner {
                resolver,
                notifier,
                guard: Mutex::new(SessionGuard {
                    snapshot: SessionSnapshot::anonymous(),
                    generation: 0,
                    next_attempt: 0,
                    applied_attempt: 0,
                    subscription: None,
                    follower: None,
                }),
                state,
            }),
        }
    }

    /// Returns a copy of the current resolved state.
    #[must_use]
    pub fn current(&self) -> ResolvedPermissionState {
        self.inner.state.borrow().clone()
    }

    /// Returns the session snapshot the current context was switched to.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().snapshot
    }

    /// Returns a receiver notified whenever a new state is applied.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ResolvedPermissionState> {
        self.inner.state.subscribe()
    }

    /// Returns the inputs a route guard evaluates against.
    #[must_use]
    pub fn guard_context(&self) -> GuardContext {
        GuardContext {
            session: self.snapshot(),
            session_loading: false,
            permissions: self.current(),
        }
    }

    /// Returns whether a role change subscription is currently held.
    #[must_use]
    pub fn has_active_subscription(&self) -> bool {
        self.inner
            .lock()
            .subscription
            .as_ref()
            .is_some_and(RoleChangeSubscription::is_active)
    }

    /// Switches to a new session context and resolves it.
    ///
    /// The previous subscription is released first; any resolution still in
    /// flight for the previous context is discarded when it completes. The
    /// new change stream is open before the role configuration is read.
    pub async fn switch_context(&self, snapshot: SessionSnapshot) {
        let (tag, generation) = {
            let mut guard = self.inner.lock();
            guard.subscription = None;
            guard.snapshot = snapshot;
            guard.generation += 1;
            self.inner
                .state
                .send_replace(ResolvedPermissionState::loading(Utc::now()));
            (guard.issue_tag(), guard.generation)
        };

        if let (Some((user_id, tenant_id)), Some(tier)) = (snapshot.context(), snapshot.tier) {
            let listener = Arc::new(SessionRefresher {
                inner: Arc::downgrade(&self.inner),
                generation,
            });
            let subscription = self
                .inner
                .notifier
                .subscribe(user_id, tenant_id, tier, listener)
                .await;

            let mut guard = self.inner.lock();
            if guard.generation == generation {
                guard.subscription = subscription;
            }
        }

        let state = self.inner.resolver.resolve(&snapshot).await;
        self.inner.apply(tag, state);
    }

    /// Re-runs the full resolver for the current context.
    pub async fn refresh(&self) {
        self.inner.refresh(None).await;
    }

    /// Releases the subscription and publishes a signed-out deny-all state.
    pub fn sign_out(&self) {
        let mut guard = self.inner.lock();
        guard.subscription = None;
        guard.snapshot = SessionSnapshot::anonymous();
        guard.generation += 1;
        self.inner
            .state
            .send_replace(ResolvedPermissionState::deny_all(Utc::now()));
    }

    /// Follows session collaborator changes, switching context on each one.
    ///
    /// The current value is applied immediately. Following stops when the
    /// sender is dropped or the session is dropped; calling this again
    /// replaces the previous follower.
    pub fn follow(&self, mut session_changes: watch::Receiver<SessionSnapshot>) {
        let inner = Arc::downgrade(&self.inner);
        let follower = tokio::spawn(async move {
            loop {
                let snapshot = *session_changes.borrow_and_update();
                let Some(inner) = inner.upgrade() else {
                    return;
                };
                let session = PermissionSession { inner };
                if snapshot.context().is_some() {
                    session.switch_context(snapshot).await;
                } else {
                    session.sign_out();
                }
                drop(session);

                if session_changes.changed().await.is_err() {
                    return;
                }
            }
        });

        if let Some(previous) = self.inner.lock().follower.replace(follower) {
            previous.abort();
        }
    }
}

#[cfg(test)]
mod tests;
