//! Operational HTTP endpoints.
//!
//! - `/healthz`        : liveness
//! - `<metrics path>`  : self-metrics in exposition text format (unfiltered)

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::app_state::AppState;
use crate::scrape::EXPOSITION_CONTENT_TYPE;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        state.render_metrics(),
    )
        .into_response()
}
