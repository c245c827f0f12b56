use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::sync::watch;

use rolegate_core::{SessionSnapshot, TenantId, Tier, UserId};
use rolegate_domain::{DetailedBitSet, DetailedPermission, LegacyBitSet, LegacyPermission};

use crate::test_support::{FakeRoleStore, configured_role, member_session, role_name};
use crate::{
    PermissionResolver, ResolvedPermissionState, RoleChangeNotifier, RoleStore,
    SubscriptionRetryPolicy,
};

use super::PermissionSession;

fn session_over(store: Arc<FakeRoleStore>) -> PermissionSession {
    let resolver = PermissionResolver::new(store.clone());
    let notifier = RoleChangeNotifier::new(store, SubscriptionRetryPolicy::default());
    PermissionSession::new(resolver, notifier)
}

fn inspector(tenant_id: TenantId, audits_view: bool) -> rolegate_domain::CustomRole {
    configured_role(
        tenant_id,
        "Inspector",
        LegacyBitSet::deny_all(),
        DetailedBitSet::deny_all().with(DetailedPermission::AuditsView, audits_view),
    )
}

async fn next_state(
    receiver: &mut watch::Receiver<ResolvedPermissionState>,
) -> ResolvedPermissionState {
    let changed = tokio::time::timeout(Duration::from_secs(5), receiver.changed()).await;
    assert!(matches!(changed, Ok(Ok(()))), "expected a new permission state");
    receiver.borrow_and_update().clone()
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn new_session_starts_signed_out_and_deny_all() {
    let session = session_over(Arc::new(FakeRoleStore::default()));

    let state = session.current();

    assert!(!state.is_loading);
    assert_eq!(state.role_name, None);
    assert_eq!(state.legacy, LegacyBitSet::deny_all());
    assert!(!session.has_active_subscription());
}

#[tokio::test]
async fn switch_context_publishes_loading_then_resolved_state() {
    let store = Arc::new(FakeRoleStore::default());
    let user_id = UserId::new();
    let tenant_id = TenantId::new();
    store.assign(user_id, tenant_id, "Inspector").await;
    store.put_role(inspector(tenant_id, true)).await;
    let session = session_over(store);
    let mut states = session.watch_state();

    session.switch_context(member_session(user_id, tenant_id)).await;

    let state = next_state(&mut states).await;
    assert!(!state.is_loading);
    assert!(state.has_detailed_permission(DetailedPermission::AuditsView));
    assert!(session.has_active_subscription());
}

#[tokio::test]
async fn admin_context_holds_no_subscription() {
    let store = Arc::new(FakeRoleStore::default());
    let session = session_over(store.clone());

    session
        .switch_context(SessionSnapshot::authenticated(
            UserId::new(),
            TenantId::new(),
            Tier::SuperAdmin,
        ))
        .await;

    assert_eq!(session.current().role_name.as_deref(), Some("Super Admin"));
    assert!(!session.has_active_subscription());
    assert_eq!(store.subscribe_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn late_completion_for_previous_tenant_is_discarded() {
    let store = Arc::new(FakeRoleStore::default());
    let user_id = UserId::new();
    let tenant_a = TenantId::new();
    let tenant_b = TenantId::new();
    store
        .put_role(configured_role(
            tenant_a,
            "Employee",
            LegacyBitSet::grant_all(),
            DetailedBitSet::grant_all(),
        ))
        .await;
    store
        .put_role(configured_role(
            tenant_b,
            "Employee",
            LegacyBitSet::deny_all().with(LegacyPermission::Documents, true),
            DetailedBitSet::deny_all(),
        ))
        .await;
    let release_a = store.hold_config_lookups(tenant_a).await;
    let session = session_over(store.clone());

    let switching_to_a = {
        let session = session.clone();
        tokio::spawn(async move {
            session.switch_context(member_session(user_id, tenant_a)).await;
        })
    };
    wait_until(|| store.config_lookups.load(Ordering::SeqCst) == 1).await;

    session.switch_context(member_session(user_id, tenant_b)).await;
    release_a.notify_one();
    switching_to_a.await.unwrap_or_else(|_| unreachable!());

    let state = session.current();
    assert!(state.has_permission(LegacyPermission::Documents));
    assert!(!state.has_permission(LegacyPermission::Settings));
    assert_eq!(session.snapshot().tenant_id, Some(tenant_b));
}

#[tokio::test]
async fn older_refresh_completing_last_does_not_overwrite_newer_state() {
    let store = Arc::new(FakeRoleStore::default());
    let user_id = UserId::new();
    let tenant_id = TenantId::new();
    store.assign(user_id, tenant_id, "Inspector").await;
    store.put_role(inspector(tenant_id, true)).await;
    let session = session_over(store.clone());
    session.switch_context(member_session(user_id, tenant_id)).await;

    let release = store.hold_config_lookups(tenant_id).await;
    let older = {
        let session = session.clone();
        tokio::spawn(async move { session.refresh().await })
    };
    wait_until(|| store.config_lookups.load(Ordering::SeqCst) == 2).await;

    store.put_role(inspector(tenant_id, false)).await;
    session.refresh().await;
    release.notify_one();
    older.await.unwrap_or_else(|_| unreachable!());

    assert!(!session.current().has_detailed_permission(DetailedPermission::AuditsView));
}

#[tokio::test]
async fn live_edit_reaches_an_open_session_without_sign_out() {
    let store = Arc::new(FakeRoleStore::default());
    let user_id = UserId::new();
    let tenant_id = TenantId::new();
    store.assign(user_id, tenant_id, "Inspector").await;
    store.put_role(inspector(tenant_id, true)).await;
    let session = session_over(store.clone());
    session.switch_context(member_session(user_id, tenant_id)).await;
    assert!(session.current().has_detailed_permission(DetailedPermission::AuditsView));
    let mut states = session.watch_state();
    wait_until(|| session.has_active_subscription()).await;
    while store.subscriber_count().await == 0 {
        tokio::task::yield_now().await;
    }

    store
        .update_role_config(inspector(tenant_id, false))
        .await
        .unwrap_or_else(|_| unreachable!());

    let state = next_state(&mut states).await;
    assert!(!state.has_detailed_permission(DetailedPermission::AuditsView));
    assert_eq!(state.role_name.as_deref(), Some("Inspector"));
}

#[tokio::test]
async fn edits_to_unrelated_roles_do_not_re_resolve() {
    let store = Arc::new(FakeRoleStore::default());
    let user_id = UserId::new();
    let tenant_id = TenantId::new();
    store.assign(user_id, tenant_id, "Inspector").await;
    store.put_role(inspector(tenant_id, true)).await;
    store
        .put_role(configured_role(
            tenant_id,
            "Doctor",
            LegacyBitSet::deny_all(),
            DetailedBitSet::deny_all(),
        ))
        .await;
    let session = session_over(store.clone());
    session.switch_context(member_session(user_id, tenant_id)).await;
    while store.subscriber_count().await == 0 {
        tokio::task::yield_now().await;
    }
    let lookups_before = store.config_lookups.load(Ordering::SeqCst);
    let mut states = session.watch_state();

    store.notify_changed(tenant_id, &role_name("Doctor")).await;
    store.notify_changed(tenant_id, &role_name("Inspector")).await;
    next_state(&mut states).await;

    assert_eq!(store.config_lookups.load(Ordering::SeqCst), lookups_before + 1);
}

#[tokio::test]
async fn deleting_the_assigned_role_resolves_to_deny_all() {
    let store = Arc::new(FakeRoleStore::default());
    let user_id = UserId::new();
    let tenant_id = TenantId::new();
    store.assign(user_id, tenant_id, "Inspector").await;
    store.put_role(inspector(tenant_id, true)).await;
    let session = session_over(store.clone());
    session.switch_context(member_session(user_id, tenant_id)).await;
    while store.subscriber_count().await == 0 {
        tokio::task::yield_now().await;
    }
    let mut states = session.watch_state();

    store
        .delete_role_config(tenant_id, &role_name("Inspector"))
        .await
        .unwrap_or_else(|_| unreachable!());

    let state = next_state(&mut states).await;
    assert!(state.legacy.iter().all(|(_, granted)| !granted));
    assert!(state.detailed.iter().all(|(_, granted)| !granted));
    assert!(!state.is_loading);
}

#[tokio::test]
async fn sign_out_releases_subscription_and_ignores_later_edits() {
    let store = Arc::new(FakeRoleStore::default());
    let user_id = UserId::new();
    let tenant_id = TenantId::new();
    store.assign(user_id, tenant_id, "Inspector").await;
    store.put_role(inspector(tenant_id, true)).await;
    let session = session_over(store.clone());
    session.switch_context(member_session(user_id, tenant_id)).await;

    session.sign_out();
    assert!(!session.has_active_subscription());
    while store.subscriber_count().await != 0 {
        tokio::task::yield_now().await;
    }
    store
        .update_role_config(inspector(tenant_id, true))
        .await
        .unwrap_or_else(|_| unreachable!());
    tokio::task::yield_now().await;

    let state = session.current();
    assert_eq!(state.role_name, None);
    assert_eq!(state.detailed, DetailedBitSet::deny_all());
}

#[tokio::test]
async fn follow_switches_context_on_session_changes() {
    let store = Arc::new(FakeRoleStore::default());
    let user_id = UserId::new();
    let tenant_id = TenantId::new();
    store
        .put_role(configured_role(
            tenant_id,
            "Employee",
            LegacyBitSet::deny_all().with(LegacyPermission::Reports, true),
            DetailedBitSet::deny_all(),
        ))
        .await;
    let session = session_over(store);
    let (session_changes, receiver) = watch::channel(SessionSnapshot::anonymous());
    let mut states = session.watch_state();

    session.follow(receiver);
    session_changes.send_replace(member_session(user_id, tenant_id));

    loop {
        let state = next_state(&mut states).await;
        if !state.is_loading && state.role_name.is_some() {
            assert!(state.has_permission(LegacyPermission::Reports));
            break;
        }
    }

    session_changes.send_replace(SessionSnapshot::anonymous());
    loop {
        let state = next_state(&mut states).await;
        if state.role_name.is_none() && !state.is_loading {
            break;
        }
    }
    assert_eq!(session.snapshot(), SessionSnapshot::anonymous());
}

#[tokio::test(start_paused = true)]
async fn edit_made_while_the_change_stream_was_down_is_applied_on_reconnect() {
    let store = Arc::new(FakeRoleStore::default());
    let user_id = UserId::new();
    let tenant_id = TenantId::new();
    store.assign(user_id, tenant_id, "Inspector").await;
    store.put_role(inspector(tenant_id, true)).await;
    let session = session_over(store.clone());
    session.switch_context(member_session(user_id, tenant_id)).await;
    let mut states = session.watch_state();

    store.close_subscriptions().await;
    store
        .update_role_config(inspector(tenant_id, false))
        .await
        .unwrap_or_else(|_| unreachable!());

    let state = next_state(&mut states).await;
    assert!(!state.has_detailed_permission(DetailedPermission::AuditsView));
    assert!(session.has_active_subscription());
}

#[tokio::test(start_paused = true)]
async fn revocation_behind_a_full_change_buffer_is_not_lost() {
    let store = Arc::new(FakeRoleStore::default());
    let user_id = UserId::new();
    let tenant_id = TenantId::new();
    store.assign(user_id, tenant_id, "Inspector").await;
    store.put_role(inspector(tenant_id, true)).await;
    let session = session_over(store.clone());
    session.switch_context(member_session(user_id, tenant_id)).await;
    let mut states = session.watch_state();

    let release = store.hold_next_assignment_lookup().await;
    for _ in 0..70 {
        store.notify_changed(tenant_id, &role_name("Doctor")).await;
    }
    store
        .update_role_config(inspector(tenant_id, false))
        .await
        .unwrap_or_else(|_| unreachable!());
    release.notify_one();

    let state = next_state(&mut states).await;
    assert!(!state.has_detailed_permission(DetailedPermission::AuditsView));
}

#[tokio::test]
async fn creating_the_assigned_role_re_resolves_an_open_session() {
    let store = Arc::new(FakeRoleStore::default());
    let user_id = UserId::new();
    let tenant_id = TenantId::new();
    store.assign(user_id, tenant_id, "Inspector").await;
    let session = session_over(store.clone());
    session.switch_context(member_session(user_id, tenant_id)).await;
    assert!(!session.current().has_permission(LegacyPermission::Trainings));
    let mut states = session.watch_state();

    store
        .insert_role_config(inspector(tenant_id, true))
        .await
        .unwrap_or_else(|_| unreachable!());

    let state = next_state(&mut states).await;
    assert!(state.has_permission(LegacyPermission::Trainings));
    assert!(state.has_detailed_permission(DetailedPermission::AuditsView));
}
