//! Probe request and outcome types.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::policy::SuccessPolicy;

/// Default per-attempt timeout, distinct from the inter-attempt
/// interval.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default attempt budget (30 attempts at 2s covers a slow deploy).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

/// Default delay between attempts.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Immutable configuration for one polling session.
///
/// Constructed per session and discarded after use; the poller holds
/// no state across sessions.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    /// URI to probe, e.g. `http://app.internal:8080/healthz`.
    pub target: String,
    /// Upper bound on probe count. Must be at least 1.
    pub max_attempts: u32,
    /// Delay between attempts. No delay follows the final attempt.
    pub interval: Duration,
    /// Timeout applied to each individual probe.
    pub probe_timeout: Duration,
    /// Rule deciding whether a response counts as ready.
    pub policy: SuccessPolicy,
}

impl ProbeRequest {
    /// A request with the default budget: 30 attempts, 2s apart,
    /// expecting an exact 200.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            policy: SuccessPolicy::default(),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    pub fn with_policy(mut self, policy: SuccessPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Validate the request and resolve the target into a connectable
    /// address. Fails fast: no network activity happens here.
    pub fn validate(&self) -> ConfigResult<TargetAddr> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        TargetAddr::parse(&self.target)
    }
}

/// A parsed probe target: the pieces the HTTP prober needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetAddr {
    /// `host:port`, suitable for a TCP connect (DNS happens there).
    pub authority: String,
    /// Host header value.
    pub host: String,
    /// Origin-form request path, including any query.
    pub path: String,
}

impl TargetAddr {
    /// Parse an `http://` URI into its connectable parts.
    pub fn parse(target: &str) -> ConfigResult<Self> {
        let uri: http::Uri = target.parse().map_err(|e: http::uri::InvalidUri| {
            ConfigError::InvalidTarget {
                uri: target.to_string(),
                reason: e.to_string(),
            }
        })?;

        match uri.scheme_str() {
            Some("http") => {}
            Some(other) => {
                return Err(ConfigError::UnsupportedScheme {
                    uri: target.to_string(),
                    scheme: other.to_string(),
                });
            }
            None => {
                return Err(ConfigError::InvalidTarget {
                    uri: target.to_string(),
                    reason: "missing scheme".to_string(),
                });
            }
        }

        let host = uri
            .host()
            .ok_or_else(|| ConfigError::InvalidTarget {
                uri: target.to_string(),
                reason: "missing host".to_string(),
            })?
            .to_string();
        let port = uri.port_u16().unwrap_or(80);
        let path = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        Ok(TargetAddr {
            authority: format!("{host}:{port}"),
            host,
            path,
        })
    }
}

/// Classification of a single probe attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The target answered with this status code.
    Responded(u16),
    /// The attempt exceeded its per-attempt timeout.
    TimedOut,
    /// Connection refused, DNS failure, or similar. DNS-not-resolved
    /// is not special-cased: new deployments may not have propagated
    /// yet, so it retries within budget like any other failure.
    NetworkError(String),
}

/// Why a session (or its final attempt) did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProbeFailure {
    /// The target responded but the success policy rejected the status.
    UnexpectedStatus(u16),
    /// The final attempt timed out.
    TimedOut,
    /// The final attempt failed at the network layer.
    NetworkError(String),
    /// No attempt produced a concrete failure to surface. Since every
    /// session runs at least one attempt this is a fallback, not the
    /// common path.
    BudgetExhausted,
    /// The session was cancelled before reaching a terminal state.
    Cancelled,
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeFailure::UnexpectedStatus(status) => write!(f, "status {status}"),
            ProbeFailure::TimedOut => write!(f, "timed out"),
            ProbeFailure::NetworkError(reason) => write!(f, "network error: {reason}"),
            ProbeFailure::BudgetExhausted => write!(f, "attempt budget exhausted"),
            ProbeFailure::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of one polling session. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// Whether the target was observed ready within budget.
    pub success: bool,
    /// Probes issued. In `[1, max_attempts]` for sessions that ran to
    /// a natural terminal state; 0 only when cancelled before the
    /// first probe.
    pub attempts_used: u32,
    /// Wall-clock duration of the whole session.
    pub elapsed_ms: u64,
    /// Last failure observed, present only when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<ProbeFailure>,
}

impl ProbeOutcome {
    /// A successful session.
    pub fn ready(attempts_used: u32, elapsed: Duration) -> Self {
        Self {
            success: true,
            attempts_used,
            elapsed_ms: elapsed.as_millis() as u64,
            last_error: None,
        }
    }

    /// A failed session carrying its last observed failure.
    pub fn not_ready(attempts_used: u32, elapsed: Duration, failure: ProbeFailure) -> Self {
        Self {
            success: false,
            attempts_used,
            elapsed_ms: elapsed.as_millis() as u64,
            last_error: Some(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults() {
        let req = ProbeRequest::new("http://app.internal/healthz");
        assert_eq!(req.max_attempts, 30);
        assert_eq!(req.interval, Duration::from_secs(2));
        assert_eq!(req.probe_timeout, Duration::from_secs(5));
    }

    #[test]
    fn validate_rejects_zero_attempts() {
        let req = ProbeRequest::new("http://app.internal/healthz").with_max_attempts(0);
        assert_eq!(req.validate(), Err(ConfigError::ZeroAttempts));
    }

    #[test]
    fn validate_rejects_https() {
        let req = ProbeRequest::new("https://app.internal/healthz");
        assert!(matches!(
            req.validate(),
            Err(ConfigError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn validate_rejects_missing_scheme() {
        let req = ProbeRequest::new("app.internal/healthz");
        assert!(matches!(req.validate(), Err(ConfigError::InvalidTarget { .. })));
    }

    #[test]
    fn target_parse_defaults_port_and_path() {
        let addr = TargetAddr::parse("http://app.internal").unwrap();
        assert_eq!(addr.authority, "app.internal:80");
        assert_eq!(addr.host, "app.internal");
        assert_eq!(addr.path, "/");
    }

    #[test]
    fn target_parse_keeps_port_and_query() {
        let addr = TargetAddr::parse("http://10.0.0.7:8080/healthz?deep=1").unwrap();
        assert_eq!(addr.authority, "10.0.0.7:8080");
        assert_eq!(addr.path, "/healthz?deep=1");
    }

    #[test]
    fn outcome_serializes_to_report_json() {
        let outcome = ProbeOutcome::ready(3, Duration::from_millis(4012));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["attempts_used"], 3);
        assert_eq!(json["elapsed_ms"], 4012);
        assert!(json.get("last_error").is_none());
    }

    #[test]
    fn failed_outcome_carries_last_error() {
        let outcome = ProbeOutcome::not_ready(
            30,
            Duration::from_secs(60),
            ProbeFailure::UnexpectedStatus(503),
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["last_error"]["kind"], "unexpected_status");
        assert_eq!(json["last_error"]["detail"], 503);
    }

    #[test]
    fn failure_display_is_terse() {
        assert_eq!(ProbeFailure::UnexpectedStatus(503).to_string(), "status 503");
        assert_eq!(ProbeFailure::TimedOut.to_string(), "timed out");
        assert_eq!(
            ProbeFailure::NetworkError("connection refused".into()).to_string(),
            "network error: connection refused"
        );
    }
}
