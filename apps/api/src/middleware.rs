use axum::extract::Request;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use rolegate_core::{SessionSnapshot, TenantId, Tier, UserId};
use tracing::debug;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const TENANT_ID_HEADER: &str = "x-tenant-id";
pub const USER_TIER_HEADER: &str = "x-user-tier";

/// Attaches the gateway-supplied session to the request.
///
/// Missing or malformed identity headers produce an anonymous session; the
/// resolver treats that as no session and denies everything.
pub async fn attach_session(mut request: Request, next: Next) -> Response {
    let session = session_from_headers(request.headers());
    request.extensions_mut().insert(session);
    next.run(request).await
}

pub fn session_from_headers(headers: &HeaderMap) -> SessionSnapshot {
    let Some(user_id) = header_value(headers, USER_ID_HEADER)
        .and_then(|value| Uuid::parse_str(value).ok())
        .map(UserId::from_uuid)
    else {
        return SessionSnapshot::anonymous();
    };

    let tenant_id = header_value(headers, TENANT_ID_HEADER)
        .and_then(|value| Uuid::parse_str(value).ok())
        .map(TenantId::from_uuid);
    let tier = header_value(headers, USER_TIER_HEADER).and_then(|value| {
        value
            .parse::<Tier>()
            .inspect_err(|error| debug!(%error, "ignoring unknown tier header"))
            .ok()
    });

    SessionSnapshot {
        user_id: Some(user_id),
        tenant_id,
        tier,
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
