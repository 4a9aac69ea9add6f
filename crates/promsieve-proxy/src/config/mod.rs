//! Proxy config loader (strict parsing).

pub mod duration;
pub mod schema;

use std::fs;

use promsieve_core::error::{Result, SieveError};

pub use duration::parse_duration;
pub use schema::{
    ActionSpec, ConnectTo, LabelFilter, ListenOn, MetricsSection, ProxySection,
    ResolutionStateSection, SieveConfig,
};

pub fn load_from_file(path: &str) -> Result<SieveConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| SieveError::Config(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<SieveConfig> {
    let cfg: SieveConfig =
        serde_yaml::from_str(s).map_err(|e| SieveError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
