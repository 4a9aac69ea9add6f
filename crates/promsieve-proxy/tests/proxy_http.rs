//! HTTP round trips: real upstream, real proxy router, real client.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{http::StatusCode, routing::get, Router};
use tokio::net::TcpListener;

use promsieve_proxy::app_state::AppState;
use promsieve_proxy::config;
use promsieve_proxy::router::{build_ops_router, build_proxy_router};

const NODE_BODY: &str = "\
# HELP node_cpu_seconds_total Seconds the CPUs spent in each mode.
# TYPE node_cpu_seconds_total counter
node_cpu_seconds_total{cpu=\"0\",mode=\"idle\"} 100
# HELP go_goroutines Number of goroutines.
# TYPE go_goroutines gauge
go_goroutines 9
";

async fn spawn(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn spawn_upstream() -> SocketAddr {
    let app = Router::new()
        .route("/metrics", get(|| async { NODE_BODY }))
        .route(
            "/broken",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "exporter crashed") }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                NODE_BODY
            }),
        );
    spawn(app).await
}

fn app_state(upstream: &str) -> AppState {
    let yaml = format!(
        r#"
proxies:
  - listen_on: {{ url: "http://127.0.0.1:0/metrics" }}
    connect_to: {{ url: "{upstream}", timeout: 300ms }}
    label_filters:
      - regex: .*
        actions: [drop]
      - regex: node_cpu.*
        actions: [keep]
metrics:
  url: "http://127.0.0.1:1/self"
"#
    );
    let cfg = config::load_from_str(&yaml).unwrap();
    AppState::new(&cfg).unwrap()
}

async fn spawn_proxy(state: &AppState) -> SocketAddr {
    spawn(build_proxy_router(state.endpoints()[0].clone())).await
}

#[tokio::test]
async fn filtered_scrape_round_trip() {
    let up = spawn_upstream().await;
    let state = app_state(&format!("http://{up}/metrics"));
    let proxy = spawn_proxy(&state).await;

    let resp = reqwest::get(format!("http://{proxy}/metrics")).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let ct = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(ct.starts_with("text/plain; version=0.0.4"), "{ct}");

    let body = resp.text().await.unwrap();
    assert_eq!(
        body,
        "# HELP node_cpu_seconds_total Seconds the CPUs spent in each mode.
# TYPE node_cpu_seconds_total counter
node_cpu_seconds_total{cpu=\"0\",mode=\"idle\"} 100
"
    );
}

#[tokio::test]
async fn other_paths_are_not_served() {
    let up = spawn_upstream().await;
    let state = app_state(&format!("http://{up}/metrics"));
    let proxy = spawn_proxy(&state).await;

    let resp = reqwest::get(format!("http://{proxy}/other")).await.unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn upstream_error_status_is_bad_gateway() {
    let up = spawn_upstream().await;
    let state = app_state(&format!("http://{up}/broken"));
    let proxy = spawn_proxy(&state).await;

    let resp = reqwest::get(format!("http://{proxy}/metrics")).await.unwrap();
    assert_eq!(resp.status().as_u16(), 502);
    assert!(resp.text().await.unwrap().contains("500"));
}

#[tokio::test]
async fn unreachable_upstream_is_bad_gateway() {
    // bind then drop to get a port nobody listens on
    let closed = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
    let state = app_state(&format!("http://{closed}/metrics"));
    let proxy = spawn_proxy(&state).await;

    let resp = reqwest::get(format!("http://{proxy}/metrics")).await.unwrap();
    assert_eq!(resp.status().as_u16(), 502);
}

#[tokio::test]
async fn slow_upstream_times_out_within_bound() {
    let up = spawn_upstream().await;
    let state = app_state(&format!("http://{up}/slow"));
    let proxy = spawn_proxy(&state).await;

    let started = Instant::now();
    let resp = reqwest::get(format!("http://{proxy}/metrics")).await.unwrap();
    assert_eq!(resp.status().as_u16(), 504);
    assert!(started.elapsed() < Duration::from_secs(3), "took {:?}", started.elapsed());
}

#[tokio::test]
async fn self_metrics_count_scrapes_and_samples() {
    let up = spawn_upstream().await;
    let state = app_state(&format!("http://{up}/metrics"));
    let proxy = spawn_proxy(&state).await;
    let ops = spawn(build_ops_router(state.clone(), "/self")).await;

    for _ in 0..2 {
        let resp = reqwest::get(format!("http://{proxy}/metrics")).await.unwrap();
        assert_eq!(resp.status().as_u16(), 200);
    }

    let health = reqwest::get(format!("http://{ops}/healthz")).await.unwrap();
    assert_eq!(health.status().as_u16(), 200);

    let body = reqwest::get(format!("http://{ops}/self"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let name = "127.0.0.1:0/metrics";
    let m = state.metrics();
    assert_eq!(m.scrapes.get(&[("proxy", name), ("status", "200")]), 2);
    assert_eq!(m.samples.get(&[("proxy", name), ("outcome", "kept")]), 2);
    assert_eq!(m.samples.get(&[("outcome", "dropped"), ("proxy", name)]), 2);
    assert_eq!(m.samples.get(&[("proxy", name), ("outcome", "reduced")]), 0);
    assert_eq!(m.upstream_failures.get(&[("proxy", name), ("reason", "timeout")]), 0);

    let proxy_label = "proxy=\"127.0.0.1:0/metrics\"";
    assert!(
        body.contains(&format!("promsieve_scrapes_total{{{proxy_label},status=\"200\"}} 2")),
        "{body}"
    );
    assert!(body.contains("# TYPE promsieve_scrape_duration_micros histogram"));
    assert!(body.contains(&format!("promsieve_resolution_series{{{proxy_label}}} 0")));
}
