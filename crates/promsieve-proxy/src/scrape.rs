//! Scrape handler: fetch upstream, filter, answer.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use promsieve_core::error::{ErrorCode, Result};

use crate::app_state::EndpointState;
use crate::pipeline::{run_pipeline, Filtered};

pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Individually logged malformed lines per scrape; the rest are summarized.
const MAX_LOGGED_PARSE_ERRORS: usize = 3;

/// HTTP status for a failed scrape.
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::UpstreamUnavailable | ErrorCode::Unparseable => StatusCode::BAD_GATEWAY,
        ErrorCode::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorCode::Config | ErrorCode::Serialization | ErrorCode::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn failure_reason(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::UpstreamTimeout => "timeout",
        ErrorCode::Unparseable => "unparseable",
        _ => "unavailable",
    }
}

fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

pub async fn scrape(State(ep): State<EndpointState>) -> Response {
    let started = Instant::now();
    let proxy = ep.name();
    let metrics = ep.metrics();

    let (status, resp) = match scrape_once(&ep).await {
        Ok(filtered) => {
            record_success(&ep, &filtered);
            (
                StatusCode::OK,
                (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
                    filtered.body,
                )
                    .into_response(),
            )
        }
        Err(e) => {
            let code = e.code();
            let status = status_for(code);
            if code.is_upstream() {
                metrics
                    .upstream_failures
                    .inc(&[("proxy", proxy), ("reason", failure_reason(code))]);
                tracing::warn!(proxy = %proxy, code = code.as_str(), error = %e, "upstream scrape failed");
            } else {
                if code == ErrorCode::Serialization {
                    metrics.serialization_errors.inc(&[("proxy", proxy)]);
                }
                tracing::error!(proxy = %proxy, code = code.as_str(), error = %e, "scrape failed");
            }
            (status, (status, format!("{e}\n")).into_response())
        }
    };

    metrics
        .scrapes
        .inc(&[("proxy", proxy), ("status", status.as_str())]);
    metrics
        .scrape_duration
        .observe(&[("proxy", proxy)], started.elapsed());
    resp
}

async fn scrape_once(ep: &EndpointState) -> Result<Filtered> {
    let body = ep.upstream().fetch().await?;
    let store = ep.store();
    run_pipeline(body, ep.engine(), &store, unix_millis())
}

fn record_success(ep: &EndpointState, filtered: &Filtered) {
    let proxy = ep.name();
    let metrics = ep.metrics();
    let stats = filtered.stats;

    metrics.samples.add(&[("proxy", proxy), ("outcome", "kept")], stats.kept);
    metrics.samples.add(&[("proxy", proxy), ("outcome", "dropped")], stats.dropped);
    metrics.samples.add(&[("proxy", proxy), ("outcome", "reduced")], stats.reduced);

    if filtered.parse_errors.is_empty() {
        return;
    }
    let skipped = filtered.parse_errors.len();
    metrics
        .parse_errors
        .add(&[("proxy", proxy)], u64::try_from(skipped).unwrap_or(u64::MAX));
    for e in filtered.parse_errors.iter().take(MAX_LOGGED_PARSE_ERRORS) {
        tracing::warn!(proxy = %proxy, line = e.line, reason = %e.kind, "skipped malformed upstream line");
    }
    if skipped > MAX_LOGGED_PARSE_ERRORS {
        tracing::warn!(proxy = %proxy, skipped, "skipped further malformed upstream lines");
    }
}
