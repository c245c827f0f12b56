use axum::Router;
use axum::middleware::from_fn;
use axum::routing::{delete, get, post, put};
use rolegate_core::AppError;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

mod cors;

use cors::build_cors_layer;

pub fn build_router(app_state: AppState, frontend_url: &str) -> Result<Router, AppError> {
    let session_routes = Router::new()
        .route(
            "/api/permissions/me",
            get(handlers::permissions::my_permissions_handler),
        )
        .route(
            "/api/permissions/route-check",
            post(handlers::permissions::route_check_handler),
        )
        .route(
            "/api/permissions/stream",
            get(handlers::permissions::permission_stream_handler),
        )
        .route(
            "/api/roles",
            get(handlers::roles::list_roles_handler).post(handlers::roles::create_role_handler),
        )
        .route(
            "/api/roles/predefined",
            post(handlers::roles::ensure_predefined_roles_handler),
        )
        .route(
            "/api/roles/{role_name}",
            delete(handlers::roles::delete_role_handler),
        )
        .route(
            "/api/roles/{role_name}/permissions",
            put(handlers::roles::update_detailed_permission_handler),
        )
        .route(
            "/api/roles/{role_name}/legacy-permissions",
            put(handlers::roles::update_legacy_permission_handler),
        )
        .route(
            "/api/roles/{role_name}/description",
            put(handlers::roles::update_description_handler),
        )
        .route_layer(from_fn(middleware::attach_session));

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route(
            "/api/permissions/schema",
            get(handlers::permissions::permission_schema_handler),
        )
        .merge(session_routes)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(frontend_url)?)
        .with_state(app_state))
}

#[cfg(test)]
mod tests;
