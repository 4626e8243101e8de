use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware;
use crate::AppState;

pub mod extract;
pub mod handlers;

/// Request bodies here are a handful of short strings.
const BODY_LIMIT_BYTES: usize = 64 * 1024;

/// Routes only, no cross-cutting layers.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register/", post(handlers::register))
        .route("/register", post(handlers::register))
        .route("/signin/", post(handlers::sign_in))
        .route("/signin", post(handlers::sign_in))
        .route(
            "/cats/",
            get(handlers::list_cats).post(handlers::create_cat),
        )
        .route(
            "/cats",
            get(handlers::list_cats).post(handlers::create_cat),
        )
        .route(
            "/cat/:id",
            get(handlers::get_cat)
                .put(handlers::put_cat)
                .delete(handlers::delete_cat),
        )
}

/// The full application: routes, health checks and every layer the server runs with.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = middleware::cors_layer(&state.config.allowed_origin);

    Router::new()
        // Health endpoints (no auth)
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(|| async { "ok" }))
        .merge(api_router())
        .fallback(fallback_404)
        .with_state(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum::middleware::from_fn(middleware::request_id))
        .layer(axum::middleware::from_fn(middleware::security_headers))
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}
