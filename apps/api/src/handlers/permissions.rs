use std::pin::Pin;
use std::task::{Context, Poll};

use axum::Json;
use axum::extract::{Extension, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use rolegate_application::{
    GuardContext, PermissionSession, ResolvedPermissionState, RouteGuard, RouteRequirement,
};
use rolegate_core::{SessionSnapshot, Tier};
use rolegate_domain::LegacyPermission;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::{Stream, StreamExt};

use crate::dto::{
    PermissionSchemaResponse, PermissionStateResponse, RouteCheckRequest, RouteCheckResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

const PERMISSION_EVENT: &str = "permissions";

pub async fn my_permissions_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionSnapshot>,
) -> Json<PermissionStateResponse> {
    let resolved = state.resolver.resolve(&session).await;
    Json(PermissionStateResponse::from(&resolved))
}

pub async fn permission_schema_handler() -> Json<PermissionSchemaResponse> {
    Json(PermissionSchemaResponse::catalog())
}

pub async fn route_check_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionSnapshot>,
    Json(payload): Json<RouteCheckRequest>,
) -> ApiResult<Json<RouteCheckResponse>> {
    let requirement = RouteRequirement {
        required_permission: payload
            .required_permission
            .as_deref()
            .map(str::parse::<LegacyPermission>)
            .transpose()?,
        required_role: payload
            .required_role
            .as_deref()
            .map(str::parse::<Tier>)
            .transpose()?,
    };

    let context = GuardContext {
        session,
        session_loading: false,
        permissions: state.resolver.resolve(&session).await,
    };
    let mut guard = RouteGuard::new(requirement);
    let notice = guard.reevaluate(&context, payload.path.as_str());

    Ok(Json(RouteCheckResponse::from_guard(guard.state(), notice)))
}

/// Streams the caller's resolved permissions, re-sent whenever their role is
/// edited. The session context lives as long as the connection.
pub async fn permission_stream_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionSnapshot>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let permission_session = state.open_permission_session();
    permission_session.switch_context(session).await;

    let events = PermissionUpdates::new(permission_session)
        .filter(|resolved| !resolved.is_loading)
        .map(|resolved| {
            Event::default()
                .event(PERMISSION_EVENT)
                .json_data(PermissionStateResponse::from(&resolved))
        });

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Resolved states of a session that is dropped with the stream.
struct PermissionUpdates {
    _session: PermissionSession,
    states: WatchStream<ResolvedPermissionState>,
}

impl PermissionUpdates {
    fn new(session: PermissionSession) -> Self {
        let states = WatchStream::new(session.watch_state());
        Self {
            _session: session,
            states,
        }
    }
}

impl Stream for PermissionUpdates {
    type Item = ResolvedPermissionState;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.states).poll_next(cx)
    }
}
