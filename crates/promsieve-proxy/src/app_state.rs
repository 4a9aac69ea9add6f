//! Shared application state for the promsieve proxy.
//!
//! Everything is compiled up front: if any endpoint fails to build, startup
//! fails as a whole. After that the state is read-only except for the
//! per-endpoint resolution stores and the self-metrics counters.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use promsieve_core::error::Result;

use crate::config::{ProxySection, SieveConfig};
use crate::obs::ProxyMetrics;
use crate::policy::RuleEngine;
use crate::reduce::ResolutionStore;
use crate::upstream::UpstreamClient;

/// One proxied endpoint. Cheap to clone; shares nothing with other endpoints
/// except the process-wide self-metrics registry.
#[derive(Clone)]
pub struct EndpointState {
    inner: Arc<EndpointInner>,
}

struct EndpointInner {
    name: String,
    listen: SocketAddr,
    path: String,
    upstream: UpstreamClient,
    engine: RuleEngine,
    store: Arc<ResolutionStore>,
    metrics: Arc<ProxyMetrics>,
}

impl EndpointState {
    /// Build the runtime for `proxies[idx]`.
    pub fn from_config(idx: usize, cfg: &ProxySection, metrics: Arc<ProxyMetrics>) -> Result<Self> {
        let (listen, path) = cfg.listen_on.resolve(&format!("proxies[{idx}].listen_on.url"))?;
        let upstream = UpstreamClient::new(
            cfg.connect_to.upstream_url(idx)?,
            cfg.connect_to.timeout(idx)?,
        )?;
        let engine = RuleEngine::compile(idx, &cfg.label_filters)?;

        Ok(Self {
            inner: Arc::new(EndpointInner {
                name: format!("{listen}{path}"),
                listen,
                path,
                upstream,
                engine,
                store: Arc::new(ResolutionStore::new()),
                metrics,
            }),
        })
    }

    /// Label value identifying this endpoint in logs and self-metrics.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn listen(&self) -> SocketAddr {
        self.inner.listen
    }

    pub fn path(&self) -> &str {
        &self.inner.path
    }

    pub fn upstream(&self) -> &UpstreamClient {
        &self.inner.upstream
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.inner.engine
    }

    pub fn store(&self) -> Arc<ResolutionStore> {
        Arc::clone(&self.inner.store)
    }

    pub fn metrics(&self) -> &ProxyMetrics {
        &self.inner.metrics
    }
}

/// Whole-process state: every endpoint plus the self-metrics listener.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    endpoints: Vec<EndpointState>,
    metrics: Arc<ProxyMetrics>,
    metrics_listen: Option<(SocketAddr, String)>,
    staleness: Duration,
    sweep_interval: Duration,
}

impl AppState {
    /// Build application state.
    /// Returns Result so main can exit non-zero instead of panicking.
    pub fn new(cfg: &SieveConfig) -> Result<Self> {
        let metrics = Arc::new(ProxyMetrics::new());

        let endpoints = cfg
            .proxies
            .iter()
            .enumerate()
            .map(|(i, p)| EndpointState::from_config(i, p, Arc::clone(&metrics)))
            .collect::<Result<Vec<_>>>()?;

        for ep in &endpoints {
            tracing::info!(
                proxy = %ep.name(),
                upstream = %ep.upstream().url(),
                rules = ep.engine().len(),
                "endpoint compiled"
            );
        }

        let metrics_listen = cfg.metrics.as_ref().map(|m| m.resolve()).transpose()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                endpoints,
                metrics,
                metrics_listen,
                staleness: cfg.resolution_state.staleness()?,
                sweep_interval: cfg.resolution_state.sweep_interval()?,
            }),
        })
    }

    pub fn endpoints(&self) -> &[EndpointState] {
        &self.inner.endpoints
    }

    pub fn metrics(&self) -> &ProxyMetrics {
        &self.inner.metrics
    }

    pub fn metrics_listen(&self) -> Option<&(SocketAddr, String)> {
        self.inner.metrics_listen.as_ref()
    }

    pub fn staleness(&self) -> Duration {
        self.inner.staleness
    }

    pub fn sweep_interval(&self) -> Duration {
        self.inner.sweep_interval
    }

    /// Refresh point-in-time gauges, then render.
    pub fn render_metrics(&self) -> String {
        for ep in self.endpoints() {
            let tracked = i64::try_from(ep.store().len()).unwrap_or(i64::MAX);
            self.metrics()
                .resolution_series
                .set(&[("proxy", ep.name())], tracked);
        }
        self.metrics().render()
    }
}
