use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use promsieve_core::error::{Result, SieveError};

use super::duration::parse_duration;
use crate::policy::compile_rules;
use crate::router::HEALTHZ_PATH;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SieveConfig {
    pub proxies: Vec<ProxySection>,

    #[serde(default)]
    pub metrics: Option<MetricsSection>,

    #[serde(default)]
    pub resolution_state: ResolutionStateSection,
}

impl SieveConfig {
    pub fn validate(&self) -> Result<()> {
        if self.proxies.is_empty() {
            return Err(SieveError::Config("proxies must not be empty".into()));
        }

        let mut seen: HashSet<SocketAddr> = HashSet::new();
        for (i, p) in self.proxies.iter().enumerate() {
            p.validate(i)?;
            let (addr, _) = p.listen_on.resolve(&format!("proxies[{i}].listen_on.url"))?;
            if !seen.insert(addr) {
                return Err(SieveError::Config(format!(
                    "proxies[{i}].listen_on.url: duplicate listen address {addr}"
                )));
            }
        }

        if let Some(m) = &self.metrics {
            let (addr, _) = m.resolve()?;
            if !seen.insert(addr) {
                return Err(SieveError::Config(format!(
                    "metrics.url: listen address {addr} already used by a proxy"
                )));
            }
        }

        self.resolution_state.validate()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxySection {
    pub listen_on: ListenOn,
    pub connect_to: ConnectTo,
    #[serde(default)]
    pub label_filters: Vec<LabelFilter>,
}

impl ProxySection {
    fn validate(&self, idx: usize) -> Result<()> {
        self.listen_on.resolve(&format!("proxies[{idx}].listen_on.url"))?;
        self.connect_to.upstream_url(idx)?;
        self.connect_to.timeout(idx)?;
        compile_rules(idx, &self.label_filters)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListenOn {
    pub url: String,
}

impl ListenOn {
    /// Socket address and route path of this listener.
    pub fn resolve(&self, field: &str) -> Result<(SocketAddr, String)> {
        parse_listen_url(field, &self.url)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectTo {
    pub url: String,

    #[serde(default = "default_connect_timeout")]
    pub timeout: String,
}

impl ConnectTo {
    pub fn upstream_url(&self, idx: usize) -> Result<Url> {
        let url = Url::parse(&self.url).map_err(|e| {
            SieveError::Config(format!("proxies[{idx}].connect_to.url: {e}"))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(SieveError::Config(format!(
                "proxies[{idx}].connect_to.url: unsupported scheme {other:?}"
            ))),
        }
    }

    pub fn timeout(&self, idx: usize) -> Result<Duration> {
        positive_duration(&format!("proxies[{idx}].connect_to.timeout"), &self.timeout)
    }
}

fn default_connect_timeout() -> String {
    "10s".into()
}

/// One entry of `label_filters`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LabelFilter {
    pub regex: String,
    /// `None` means `[__name__]`.
    #[serde(default)]
    pub source_labels: Option<Vec<String>>,
    pub actions: Vec<ActionSpec>,
}

/// `drop`, `keep`, or `reduce_time_resolution: { resolution: 30s }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ActionSpec {
    Named(String),
    Reduce(ReduceSpec),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReduceSpec {
    pub reduce_time_resolution: ResolutionSpec,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolutionSpec {
    pub resolution: String,
}

/// Listener for the proxy's own operational metrics.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    pub url: String,
}

impl MetricsSection {
    pub fn resolve(&self) -> Result<(SocketAddr, String)> {
        let (addr, path) = parse_listen_url("metrics.url", &self.url)?;
        if path == HEALTHZ_PATH {
            return Err(SieveError::Config(format!(
                "metrics.url: path {HEALTHZ_PATH} is reserved for liveness"
            )));
        }
        Ok((addr, path))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolutionStateSection {
    #[serde(default = "default_staleness")]
    pub staleness: String,

    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: String,
}

impl Default for ResolutionStateSection {
    fn default() -> Self {
        Self {
            staleness: default_staleness(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

impl ResolutionStateSection {
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval()? > self.staleness()? {
            return Err(SieveError::Config(
                "resolution_state.sweep_interval must not exceed staleness".into(),
            ));
        }
        Ok(())
    }

    pub fn staleness(&self) -> Result<Duration> {
        positive_duration("resolution_state.staleness", &self.staleness)
    }

    pub fn sweep_interval(&self) -> Result<Duration> {
        positive_duration("resolution_state.sweep_interval", &self.sweep_interval)
    }
}

fn default_staleness() -> String {
    "10m".into()
}
fn default_sweep_interval() -> String {
    "1m".into()
}

fn positive_duration(field: &str, raw: &str) -> Result<Duration> {
    let d = parse_duration(raw).map_err(|e| SieveError::Config(format!("{field}: {e}")))?;
    if d.is_zero() {
        return Err(SieveError::Config(format!("{field}: must be positive")));
    }
    Ok(d)
}

/// `http://<ip|localhost>[:port][/path]` -> (socket address, path).
fn parse_listen_url(field: &str, raw: &str) -> Result<(SocketAddr, String)> {
    let url = Url::parse(raw).map_err(|e| SieveError::Config(format!("{field}: {e}")))?;
    if url.scheme() != "http" {
        return Err(SieveError::Config(format!(
            "{field}: only plain http listeners are supported, got {:?}",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .ok_or_else(|| SieveError::Config(format!("{field}: missing host")))?;
    let ip: IpAddr = if host == "localhost" {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    } else {
        host.trim_start_matches('[')
            .trim_end_matches(']')
            .parse()
            .map_err(|_| {
                SieveError::Config(format!("{field}: host must be an IP address, got {host:?}"))
            })?
    };
    let port = url
        .port_or_known_default()
        .ok_or_else(|| SieveError::Config(format!("{field}: missing port")))?;

    let path = url.path();
    if path.contains(&[':', '*', '{', '}'][..]) {
        return Err(SieveError::Config(format!(
            "{field}: path {path:?} must not contain route wildcards"
        )));
    }

    Ok((SocketAddr::new(ip, port), path.to_string()))
}
