//! Axum router wiring.
//!
//! Every matched route passes through `track_requests`, which increments
//! `http_requests_total{method,path}` with the route template as `path`.
//! Unmatched requests never reach it, so label cardinality stays bounded.

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};

use crate::{app_state::AppState, ops};

pub fn build_router(state: AppState) -> Router {
    let metrics_path = state.cfg().server.metrics_path.clone();
    let admin_enabled = state.cfg().admin.enabled;

    let mut router = Router::new()
        .route("/", get(ops::index))
        .route("/healthz", get(ops::healthz))
        .route(&metrics_path, get(ops::metrics));
    if admin_enabled {
        router = router.route("/admin/gauge", post(ops::set_gauge));
    }

    router
        .route_layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .with_state(state)
}

async fn track_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());

    if let Err(e) = state.record_request(req.method().as_str(), &path) {
        tracing::warn!(error = %e, %path, "request not counted");
    }
    next.run(req).await
}
