//! Route registration — collects module routes + system endpoints.

use std::sync::Arc;

use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::auth_middleware::{self, JwtState};

/// Application shared state.
#[derive(Clone)]
pub struct AppState {
    pub jwt_state: Arc<JwtState>,
}

/// Build the complete router with all routes.
///
/// Each module mounts under `/{module_name}`; admin routers mount under
/// `/admin/{module_name}`. The JWT middleware wraps everything and skips
/// the public paths.
pub fn build_router(
    state: AppState,
    module_routes: Vec<(&str, Router)>,
    admin_routes: Vec<(&str, Router)>,
) -> Router {
    let mut app: Router = Router::new()
        .route("/health", get(health))
        .route("/version", get(version));

    for (name, router) in module_routes {
        app = app.nest(&format!("/{}", name), router);
    }

    for (name, router) in admin_routes {
        app = app.nest(&format!("/admin/{}", name), router);
    }

    app.layer(middleware::from_fn_with_state(
        state.jwt_state,
        auth_middleware::auth_middleware,
    ))
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
    }))
}

async fn version() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": "dropspotd",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
