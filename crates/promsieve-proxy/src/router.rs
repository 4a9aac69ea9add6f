//! Axum router wiring.
//!
//! Each proxied endpoint gets its own router serving a single scrape path;
//! the self-metrics listener serves `/healthz` and its metrics path.

use axum::{routing::get, Router};

use crate::{app_state::AppState, app_state::EndpointState, ops, scrape};

pub const HEALTHZ_PATH: &str = "/healthz";

pub fn build_proxy_router(ep: EndpointState) -> Router {
    let path = ep.path().to_string();
    Router::new()
        .route(&path, get(scrape::scrape))
        .with_state(ep)
}

pub fn build_ops_router(state: AppState, metrics_path: &str) -> Router {
    Router::new()
        .route(HEALTHZ_PATH, get(ops::healthz))
        .route(metrics_path, get(ops::metrics))
        .with_state(state)
}
