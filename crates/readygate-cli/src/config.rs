//! readygate.toml parsing.
//!
//! A target list with optional per-target overrides:
//!
//! ```toml
//! [defaults]
//! max_attempts = 30
//! interval = "2s"
//!
//! [[target]]
//! url = "http://app.internal:8080/healthz"
//!
//! [[target]]
//! url = "http://api.internal:8080/readyz"
//! expect = 204
//! max_attempts = 10
//! ```

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use readygate_core::{ConfigError, ProbeRequest, SuccessPolicy, parse_duration};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitConfig {
    pub defaults: Option<DefaultsConfig>,
    #[serde(rename = "target", default)]
    pub targets: Vec<TargetConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    pub max_attempts: Option<u32>,
    pub interval: Option<String>,
    pub probe_timeout: Option<String>,
    pub expect: Option<u16>,
    pub accept_redirects: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub url: String,
    pub max_attempts: Option<u32>,
    pub interval: Option<String>,
    pub probe_timeout: Option<String>,
    pub expect: Option<u16>,
    pub accept_redirects: Option<bool>,
}

impl WaitConfig {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: WaitConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        if config.targets.is_empty() {
            anyhow::bail!("{}: no [[target]] entries", path.display());
        }
        Ok(config)
    }

    /// Build one probe request per target, applying defaults.
    pub fn requests(&self) -> anyhow::Result<Vec<ProbeRequest>> {
        let defaults = self.defaults.clone().unwrap_or_default();
        self.targets
            .iter()
            .map(|t| t.request(&defaults))
            .collect()
    }
}

impl TargetConfig {
    fn request(&self, defaults: &DefaultsConfig) -> anyhow::Result<ProbeRequest> {
        let mut request = ProbeRequest::new(&self.url);

        if let Some(max_attempts) = self.max_attempts.or(defaults.max_attempts) {
            request = request.with_max_attempts(max_attempts);
        }
        if let Some(interval) = self.interval.as_deref().or(defaults.interval.as_deref()) {
            let parsed = parse_duration(interval)
                .ok_or_else(|| ConfigError::InvalidDuration(interval.into()))
                .with_context(|| format!("target {}", self.url))?;
            request = request.with_interval(parsed);
        }
        if let Some(timeout) = self
            .probe_timeout
            .as_deref()
            .or(defaults.probe_timeout.as_deref())
        {
            let parsed = parse_duration(timeout)
                .ok_or_else(|| ConfigError::InvalidDuration(timeout.into()))
                .with_context(|| format!("target {}", self.url))?;
            request = request.with_probe_timeout(parsed);
        }

        let accept_redirects = self
            .accept_redirects
            .or(defaults.accept_redirects)
            .unwrap_or(false);
        let policy = if accept_redirects {
            SuccessPolicy::accept_redirects()
        } else if let Some(status) = self.expect.or(defaults.expect) {
            SuccessPolicy::Status(status)
        } else {
            SuccessPolicy::default()
        };
        Ok(request.with_policy(policy))
    }
}
