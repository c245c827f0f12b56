use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use rolegate_application::{RoleStore, SubscriptionRetryPolicy};
use rolegate_core::{TenantId, Tier, UserId};
use rolegate_domain::{CustomRole, LegacyPermission, RoleName};
use rolegate_infrastructure::{InMemoryAuditRepository, InMemoryRoleStore};
use serde_json::{Value, json};
use tower::ServiceExt;

use super::build_router;
use crate::api_services::build_app_state;
use crate::dto::{RoleResponse, RouteCheckResponse};
use crate::middleware::{TENANT_ID_HEADER, USER_ID_HEADER, USER_TIER_HEADER};

struct Fixture {
    router: Router,
    store: Arc<InMemoryRoleStore>,
    tenant_id: TenantId,
}

impl Fixture {
    async fn new() -> Self {
        let store = Arc::new(InMemoryRoleStore::new());
        let state = build_app_state(
            store.clone(),
            Arc::new(InMemoryAuditRepository::new()),
            SubscriptionRetryPolicy::default(),
        );
        let router = build_router(state, "http://localhost:3000")
            .unwrap_or_else(|_| unreachable!());

        Self {
            router,
            store,
            tenant_id: TenantId::new(),
        }
    }

    async fn member_with_employee_role(&self, legacy: &[LegacyPermission]) -> UserId {
        let mut role =
            CustomRole::new_predefined(self.tenant_id, RoleName::default_role(), Utc::now());
        for permission in legacy {
            role.legacy_permissions.set(*permission, true);
        }
        let inserted = self.store.insert_role_config(role).await;
        assert!(inserted.is_ok());

        let user_id = UserId::new();
        self.store
            .assign_role(user_id, self.tenant_id, RoleName::default_role())
            .await;
        user_id
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        caller: Option<(UserId, Tier)>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some((user_id, tier)) = caller {
            builder = builder
                .header(USER_ID_HEADER, user_id.to_string())
                .header(TENANT_ID_HEADER, self.tenant_id.to_string())
                .header(USER_TIER_HEADER, tier.as_str());
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap_or_else(|_| unreachable!());

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .unwrap_or_else(|_| unreachable!());
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_else(|_| unreachable!());
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| unreachable!())
        };

        (status, value)
    }
}

fn admin() -> Option<(UserId, Tier)> {
    Some((UserId::new(), Tier::TenantAdmin))
}

#[tokio::test]
async fn health_reports_ok() {
    let fixture = Fixture::new().await;

    let (status, body) = fixture.send("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn anonymous_caller_resolves_to_deny_all() {
    let fixture = Fixture::new().await;

    let (status, body) = fixture.send("GET", "/api/permissions/me", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role_name"], Value::Null);
    assert_eq!(body["permissions"]["dashboard"], json!(false));
    assert_eq!(body["permissions"]["trainings"], json!(false));
    assert_eq!(body["granted_detailed_count"], json!(0));
}

#[tokio::test]
async fn member_permissions_include_extended_flags() {
    let fixture = Fixture::new().await;
    let user_id = fixture
        .member_with_employee_role(&[LegacyPermission::Documents])
        .await;

    let (status, body) = fixture
        .send(
            "GET",
            "/api/permissions/me",
            Some((user_id, Tier::StandardMember)),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role_name"], json!("Employee"));
    assert_eq!(body["permissions"]["documents"], json!(true));
    assert_eq!(body["permissions"]["reports"], json!(false));
    assert_eq!(body["permissions"]["trainings"], json!(true));
}

#[tokio::test]
async fn route_check_follows_guard_precedence() {
    let fixture = Fixture::new().await;
    let user_id = fixture
        .member_with_employee_role(&[LegacyPermission::Documents])
        .await;
    let member = Some((user_id, Tier::StandardMember));

    let (_, anonymous) = fixture
        .send(
            "POST",
            "/api/permissions/route-check",
            None,
            Some(json!({ "path": "/documents" })),
        )
        .await;
    let (_, allowed) = fixture
        .send(
            "POST",
            "/api/permissions/route-check",
            member,
            Some(json!({ "path": "/documents/42?tab=files" })),
        )
        .await;
    let (_, denied) = fixture
        .send(
            "POST",
            "/api/permissions/route-check",
            member,
            Some(json!({ "path": "/reports" })),
        )
        .await;
    let (_, role_required) = fixture
        .send(
            "POST",
            "/api/permissions/route-check",
            member,
            Some(json!({ "path": "/documents", "required_role": "super_admin" })),
        )
        .await;

    let anonymous: RouteCheckResponse =
        serde_json::from_value(anonymous).unwrap_or_else(|_| unreachable!());
    assert_eq!(anonymous.decision, "redirect");
    assert_eq!(anonymous.target.as_deref(), Some("/auth"));
    assert_eq!(anonymous.notice, None);

    let allowed: RouteCheckResponse =
        serde_json::from_value(allowed).unwrap_or_else(|_| unreachable!());
    assert_eq!(allowed.decision, "allow");

    let denied: RouteCheckResponse =
        serde_json::from_value(denied).unwrap_or_else(|_| unreachable!());
    assert_eq!(denied.target.as_deref(), Some("/dashboard"));
    let Some(notice) = denied.notice else {
        panic!("denial should carry a notice");
    };
    assert_eq!(notice.title, "Access Denied");
    assert_eq!(
        notice.description,
        "You don't have permission to access this page."
    );

    let role_required: RouteCheckResponse =
        serde_json::from_value(role_required).unwrap_or_else(|_| unreachable!());
    assert_eq!(role_required.reason.as_deref(), Some("role_required"));
    assert_eq!(role_required.required_role.as_deref(), Some("super_admin"));
}

#[tokio::test]
async fn denied_fallback_route_does_not_redirect_to_itself() {
    let fixture = Fixture::new().await;
    let user_id = fixture.member_with_employee_role(&[]).await;

    let (_, body) = fixture
        .send(
            "POST",
            "/api/permissions/route-check",
            Some((user_id, Tier::StandardMember)),
            Some(json!({ "path": "/dashboard" })),
        )
        .await;

    let response: RouteCheckResponse =
        serde_json::from_value(body).unwrap_or_else(|_| unreachable!());
    assert_eq!(response.decision, "denied");
    assert_eq!(response.target, None);
}

#[tokio::test]
async fn unknown_required_permission_is_a_bad_request() {
    let fixture = Fixture::new().await;

    let (status, body) = fixture
        .send(
            "POST",
            "/api/permissions/route-check",
            admin(),
            Some(json!({ "path": "/documents", "required_permission": "payroll" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().is_some_and(|message| message.contains("payroll")));
}

#[tokio::test]
async fn schema_lists_catalog_and_routes() {
    let fixture = Fixture::new().await;

    let (status, body) = fixture
        .send("GET", "/api/permissions/schema", None, None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_detailed_count"], json!(29));
    let Some(categories) = body["categories"].as_array() else {
        panic!("categories should be an array");
    };
    assert!(categories.iter().any(|category| category["key"] == json!("settings")));
    let Some(legacy) = body["legacy_permissions"].as_array() else {
        panic!("legacy permissions should be an array");
    };
    assert!(legacy.iter().any(|flag| {
        flag["key"] == json!("trainings") && flag["configurable"] == json!(false)
    }));
}

#[tokio::test]
async fn role_editor_requires_role_management() {
    let fixture = Fixture::new().await;
    let user_id = fixture.member_with_employee_role(&[]).await;

    let (status, _) = fixture
        .send(
            "POST",
            "/api/roles",
            Some((user_id, Tier::StandardMember)),
            Some(json!({ "name": "Inspector" })),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_manages_custom_roles() {
    let fixture = Fixture::new().await;
    let caller = admin();

    let (created_status, created) = fixture
        .send(
            "POST",
            "/api/roles",
            caller,
            Some(json!({ "name": "  Inspector ", "description": "Site audits" })),
        )
        .await;
    assert_eq!(created_status, StatusCode::CREATED);
    let created: RoleResponse = serde_json::from_value(created).unwrap_or_else(|_| unreachable!());
    assert_eq!(created.role_name, "Inspector");
    assert_eq!(created.display_order, 100);

    let (duplicate_status, _) = fixture
        .send(
            "POST",
            "/api/roles",
            caller,
            Some(json!({ "name": "Inspector" })),
        )
        .await;
    assert_eq!(duplicate_status, StatusCode::CONFLICT);

    let (updated_status, updated) = fixture
        .send(
            "PUT",
            "/api/roles/Inspector/permissions",
            caller,
            Some(json!({ "category": "audits", "key": "view", "value": true })),
        )
        .await;
    assert_eq!(updated_status, StatusCode::OK);
    assert_eq!(updated["detailed_permissions"]["audits"]["view"], json!(true));
    assert_eq!(updated["granted_detailed_count"], json!(1));

    let (extended_status, _) = fixture
        .send(
            "PUT",
            "/api/roles/Inspector/legacy-permissions",
            caller,
            Some(json!({ "key": "trainings", "value": true })),
        )
        .await;
    assert_eq!(extended_status, StatusCode::BAD_REQUEST);

    let (deleted_status, _) = fixture
        .send("DELETE", "/api/roles/Inspector", caller, None)
        .await;
    assert_eq!(deleted_status, StatusCode::NO_CONTENT);

    let (missing_status, _) = fixture
        .send(
            "PUT",
            "/api/roles/Inspector/description",
            caller,
            Some(json!({ "description": "gone" })),
        )
        .await;
    assert_eq!(missing_status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn predefined_roles_are_created_once_and_protected() {
    let fixture = Fixture::new().await;
    let caller = admin();

    let (_, first) = fixture
        .send("POST", "/api/roles/predefined", caller, None)
        .await;
    let (_, second) = fixture
        .send("POST", "/api/roles/predefined", caller, None)
        .await;
    let (delete_status, _) = fixture
        .send("DELETE", "/api/roles/Doctor", caller, None)
        .await;

    assert_eq!(first.as_array().map(Vec::len), Some(6));
    assert_eq!(second.as_array().map(Vec::len), Some(0));
    assert_eq!(delete_status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn permission_stream_opens_an_event_stream() {
    let fixture = Fixture::new().await;
    let user_id = fixture.member_with_employee_role(&[]).await;
    let request = Request::builder()
        .uri("/api/permissions/stream")
        .header(USER_ID_HEADER, user_id.to_string())
        .header(TENANT_ID_HEADER, fixture.tenant_id.to_string())
        .header(USER_TIER_HEADER, Tier::StandardMember.as_str())
        .body(Body::empty())
        .unwrap_or_else(|_| unreachable!());

    let response = fixture
        .router
        .clone()
        .oneshot(request)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    assert_eq!(content_type, Some("text/event-stream"));
}
